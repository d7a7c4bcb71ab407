use crate::db::FinanceDb;
use crate::models::Company;
use anyhow::Result;

pub(crate) const COMPANY_COLUMNS: &str = "CAST(id AS BIGINT) AS id, ticker, company_name, sector, industry, \
     CAST(market_cap AS DOUBLE PRECISION) AS market_cap, description";

pub const MAX_SEARCH_RESULTS: i64 = 50;

/// Lookups over the `companies` table.
#[derive(Clone)]
pub struct CompanyDirectory {
    db: FinanceDb,
}

impl CompanyDirectory {
    pub fn new(db: FinanceDb) -> Self {
        Self { db }
    }

    /// Get a company by ticker
    pub async fn get_company(&self, ticker: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE ticker = $1",
            COMPANY_COLUMNS
        ))
        .bind(normalize_ticker(ticker))
        .fetch_optional(self.db.pool())
        .await?;

        Ok(company)
    }

    /// Case-insensitive substring search on name or ticker
    pub async fn search_companies(&self, query: &str, limit: i64) -> Result<Vec<Company>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let companies = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies \
             WHERE LOWER(company_name) LIKE $1 ESCAPE '\\' OR LOWER(ticker) LIKE $2 ESCAPE '\\' \
             ORDER BY ticker LIMIT $3",
            COMPANY_COLUMNS
        ))
        .bind(pattern.clone())
        .bind(pattern)
        .bind(limit.clamp(1, MAX_SEARCH_RESULTS))
        .fetch_all(self.db.pool())
        .await?;

        Ok(companies)
    }
}

pub(crate) fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
