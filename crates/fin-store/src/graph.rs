use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;

use crate::companies::{normalize_ticker, COMPANY_COLUMNS};
use crate::db::FinanceDb;
use crate::models::{
    Company, CompanyNetwork, CompanyRelationship, GraphStats, NetworkEdge, NetworkNode,
    NetworkOptions, RelationshipSet,
};

/// Upper bound on traversal hops for `company_network`.
pub const MAX_GRAPH_DEPTH: u32 = 3;

const RELATIONSHIP_COLUMNS: &str = "CAST(id AS BIGINT) AS id, source_company, source_ticker, \
     target_company, target_ticker, relationship_type, \
     CAST(confidence AS DOUBLE PRECISION) AS confidence, extracted_from, \
     CAST(filing_date AS TEXT) AS filing_date";

/// Read-only exploration of `company_relationships`.
#[derive(Clone)]
pub struct RelationshipGraph {
    db: FinanceDb,
}

impl RelationshipGraph {
    pub fn new(db: FinanceDb) -> Self {
        Self { db }
    }

    /// Relationships where the ticker is source (outgoing) or target (incoming)
    pub async fn find_relationships(
        &self,
        ticker: &str,
        relationship_type: Option<&str>,
    ) -> Result<RelationshipSet> {
        let ticker = normalize_ticker(ticker);
        let relationship_type = relationship_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let outgoing = self
            .directed("source_ticker", &ticker, relationship_type.as_deref())
            .await?;
        let incoming = self
            .directed("target_ticker", &ticker, relationship_type.as_deref())
            .await?;
        let total = outgoing.len() + incoming.len();

        Ok(RelationshipSet {
            ticker,
            outgoing,
            incoming,
            total,
        })
    }

    async fn directed(
        &self,
        column: &str,
        ticker: &str,
        relationship_type: Option<&str>,
    ) -> Result<Vec<CompanyRelationship>> {
        let rows = match relationship_type {
            Some(kind) => {
                sqlx::query_as::<_, CompanyRelationship>(&format!(
                    "SELECT {} FROM company_relationships \
                     WHERE UPPER({}) = $1 AND LOWER(relationship_type) = $2 \
                     ORDER BY confidence DESC, id",
                    RELATIONSHIP_COLUMNS, column
                ))
                .bind(ticker.to_string())
                .bind(kind.to_string())
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, CompanyRelationship>(&format!(
                    "SELECT {} FROM company_relationships WHERE UPPER({}) = $1 \
                     ORDER BY confidence DESC, id",
                    RELATIONSHIP_COLUMNS, column
                ))
                .bind(ticker.to_string())
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows)
    }

    /// Breadth-first network around a ticker, following edges in both directions.
    pub async fn company_network(
        &self,
        ticker: &str,
        options: NetworkOptions,
    ) -> Result<CompanyNetwork> {
        let root = normalize_ticker(ticker);
        let max_depth = options.depth.min(MAX_GRAPH_DEPTH);

        let mut visited: Vec<(String, u32)> = vec![(root.clone(), 0)];
        let mut seen: HashSet<String> = HashSet::from([root.clone()]);
        let mut queue: VecDeque<(String, u32)> = VecDeque::from([(root, 0)]);
        let mut edges: Vec<NetworkEdge> = Vec::new();
        let mut seen_edges: HashSet<NetworkEdge> = HashSet::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            for rel in self.neighbours(&current, options.min_confidence).await? {
                // extracted rows may carry lower-case tickers
                let (Some(source), Some(target)) = (
                    rel.source_ticker.as_deref().map(normalize_ticker),
                    rel.target_ticker.as_deref().map(normalize_ticker),
                ) else {
                    continue;
                };
                let edge = NetworkEdge {
                    source: source.clone(),
                    target: target.clone(),
                    relationship_type: rel.relationship_type,
                };
                if seen_edges.insert(edge.clone()) {
                    edges.push(edge);
                }

                let next = if source == current { target } else { source };
                if seen.insert(next.clone()) {
                    visited.push((next.clone(), depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }

        let companies = self.companies_by_ticker(&visited).await?;
        let nodes = visited
            .into_iter()
            .map(|(ticker, depth)| match companies.get(&ticker) {
                Some(company) => NetworkNode {
                    name: company.company_name.clone(),
                    sector: company.sector.clone(),
                    id: ticker,
                    depth,
                    known: true,
                },
                None => NetworkNode {
                    name: ticker.clone(),
                    sector: None,
                    id: ticker,
                    depth,
                    known: false,
                },
            })
            .collect();

        Ok(CompanyNetwork { nodes, edges })
    }

    async fn neighbours(
        &self,
        ticker: &str,
        min_confidence: f64,
    ) -> Result<Vec<CompanyRelationship>> {
        let rows = sqlx::query_as::<_, CompanyRelationship>(&format!(
            "SELECT {} FROM company_relationships \
             WHERE (UPPER(source_ticker) = $1 OR UPPER(target_ticker) = $2) \
             AND (confidence IS NULL OR confidence >= $3) \
             ORDER BY id",
            RELATIONSHIP_COLUMNS
        ))
        .bind(ticker.to_string())
        .bind(ticker.to_string())
        .bind(min_confidence)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    async fn companies_by_ticker(&self, tickers: &[(String, u32)]) -> Result<HashMap<String, Company>> {
        let mut companies = HashMap::with_capacity(tickers.len());
        for (ticker, _) in tickers {
            let company = sqlx::query_as::<_, Company>(&format!(
                "SELECT {} FROM companies WHERE ticker = $1",
                COMPANY_COLUMNS
            ))
            .bind(ticker.clone())
            .fetch_optional(self.db.pool())
            .await?;
            if let Some(company) = company {
                companies.insert(ticker.clone(), company);
            }
        }
        Ok(companies)
    }

    /// Row counts for the tables the graph routes expose
    pub async fn stats(&self) -> Result<GraphStats> {
        let (companies,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM companies")
            .fetch_one(self.db.pool())
            .await?;
        let (relationships,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM company_relationships")
                .fetch_one(self.db.pool())
                .await?;
        let (documents,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents")
            .fetch_one(self.db.pool())
            .await?;

        Ok(GraphStats {
            companies,
            relationships,
            documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_graph() -> RelationshipGraph {
        let db = FinanceDb::in_memory().await.unwrap();
        for (ticker, name) in [
            ("AAPL", "Apple Inc."),
            ("TSM", "Taiwan Semiconductor"),
            ("NVDA", "NVIDIA Corporation"),
        ] {
            sqlx::query("INSERT INTO companies (ticker, company_name, sector) VALUES ($1, $2, 'Technology')")
                .bind(ticker)
                .bind(name)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let relationships = [
            ("Apple Inc.", "AAPL", "Taiwan Semiconductor", "TSM", "supplier", 0.9),
            ("NVIDIA Corporation", "NVDA", "Taiwan Semiconductor", "TSM", "supplier", 0.8),
            ("Apple Inc.", "AAPL", "Samsung", "SSNLF", "competitor", 0.7),
            ("Apple Inc.", "AAPL", "Rumour Corp", "RMR", "partner", 0.2),
            ("ASML Holding", "ASML", "Taiwan Semiconductor", "TSM", "supplier", 0.95),
            // duplicate extraction from a second filing
            ("Apple Inc.", "AAPL", "Taiwan Semiconductor", "TSM", "supplier", 0.85),
        ];
        for (source, source_ticker, target, target_ticker, kind, confidence) in relationships {
            sqlx::query(
                "INSERT INTO company_relationships \
                 (source_company, source_ticker, target_company, target_ticker, relationship_type, confidence) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(source)
            .bind(source_ticker)
            .bind(target)
            .bind(target_ticker)
            .bind(kind)
            .bind(confidence)
            .execute(db.pool())
            .await
            .unwrap();
        }

        RelationshipGraph::new(db)
    }

    fn node_ids(network: &CompanyNetwork) -> Vec<&str> {
        network.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_find_relationships_by_direction() {
        let graph = setup_graph().await;

        let aapl = graph.find_relationships("aapl", None).await.unwrap();
        assert_eq!(aapl.ticker, "AAPL");
        assert_eq!(aapl.outgoing.len(), 4);
        assert!(aapl.incoming.is_empty());
        assert_eq!(aapl.total, 4);

        let tsm = graph.find_relationships("TSM", Some("Supplier")).await.unwrap();
        assert!(tsm.outgoing.is_empty());
        assert_eq!(tsm.incoming.len(), 4);
        assert_eq!(tsm.incoming[0].source_ticker.as_deref(), Some("ASML"));
    }

    #[tokio::test]
    async fn test_network_depth_one() {
        let graph = setup_graph().await;
        let network = graph
            .company_network("AAPL", NetworkOptions::default())
            .await
            .unwrap();

        // RMR is below the default confidence threshold
        assert_eq!(node_ids(&network), vec!["AAPL", "TSM", "SSNLF"]);
        assert_eq!(network.edges.len(), 2);
        assert!(network.nodes[0].known);
        assert_eq!(network.nodes[2].name, "SSNLF");
        assert!(!network.nodes[2].known);
    }

    #[tokio::test]
    async fn test_network_depth_two_reaches_second_hop() {
        let graph = setup_graph().await;
        let network = graph
            .company_network(
                "AAPL",
                NetworkOptions {
                    depth: 2,
                    min_confidence: 0.5,
                },
            )
            .await
            .unwrap();

        assert_eq!(node_ids(&network), vec!["AAPL", "TSM", "SSNLF", "NVDA", "ASML"]);
        let nvda = network.nodes.iter().find(|n| n.id == "NVDA").unwrap();
        assert_eq!(nvda.depth, 2);
        assert_eq!(network.edges.len(), 4);
    }

    #[tokio::test]
    async fn test_lower_case_tickers_are_normalized() {
        let graph = setup_graph().await;
        sqlx::query(
            "INSERT INTO company_relationships \
             (source_company, source_ticker, target_company, target_ticker, relationship_type, confidence) \
             VALUES ('NVIDIA Corporation', 'nvda', 'Apple Inc.', 'aapl', 'customer', 0.6)",
        )
        .execute(graph.db.pool())
        .await
        .unwrap();

        let aapl = graph.find_relationships("AAPL", None).await.unwrap();
        assert_eq!(aapl.incoming.len(), 1);

        let network = graph
            .company_network("AAPL", NetworkOptions::default())
            .await
            .unwrap();
        assert_eq!(node_ids(&network), vec!["AAPL", "TSM", "SSNLF", "NVDA"]);
        let nvda = network.nodes.iter().find(|n| n.id == "NVDA").unwrap();
        assert!(nvda.known);
        assert!(network
            .edges
            .iter()
            .any(|e| e.source == "NVDA" && e.target == "AAPL"));
    }

    #[tokio::test]
    async fn test_network_depth_is_clamped() {
        let graph = setup_graph().await;
        let clamped = graph
            .company_network(
                "AAPL",
                NetworkOptions {
                    depth: 50,
                    min_confidence: 0.0,
                },
            )
            .await
            .unwrap();

        assert!(clamped.nodes.iter().all(|n| n.depth <= MAX_GRAPH_DEPTH));
        assert!(clamped.nodes.iter().any(|n| n.id == "RMR"));
    }

    #[tokio::test]
    async fn test_network_for_isolated_ticker() {
        let graph = setup_graph().await;
        let network = graph
            .company_network("ZZZZ", NetworkOptions::default())
            .await
            .unwrap();
        assert_eq!(node_ids(&network), vec!["ZZZZ"]);
        assert!(network.edges.is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let graph = setup_graph().await;
        let stats = graph.stats().await.unwrap();
        assert_eq!(
            stats,
            GraphStats {
                companies: 3,
                relationships: 6,
                documents: 0,
            }
        );
    }
}
