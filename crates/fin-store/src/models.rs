use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: i64,
    pub ticker: String,
    pub company_name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompanyRelationship {
    pub id: i64,
    pub source_company: String,
    pub source_ticker: Option<String>,
    pub target_company: String,
    pub target_ticker: Option<String>,
    pub relationship_type: String,
    pub confidence: Option<f64>,
    pub extracted_from: Option<String>,
    pub filing_date: Option<String>,
}

/// Relationships touching one ticker, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSet {
    pub ticker: String,
    pub outgoing: Vec<CompanyRelationship>,
    pub incoming: Vec<CompanyRelationship>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub name: String,
    pub sector: Option<String>,
    /// Hops from the requested ticker.
    pub depth: u32,
    /// False when the ticker only appears in relationships, not in `companies`.
    pub known: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkOptions {
    pub depth: u32,
    pub min_confidence: f64,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub companies: i64,
    pub relationships: i64,
    pub documents: i64,
}
