//! Table descriptions of the financial database.
//!
//! Used to build the schema context handed to the text-to-SQL model. Kept in
//! step with `schema.sql`.

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub note: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: &'static [ColumnSpec],
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnSpec {
    ColumnSpec { name, sql_type, note: None }
}

const fn col_note(name: &'static str, sql_type: &'static str, note: &'static str) -> ColumnSpec {
    ColumnSpec { name, sql_type, note: Some(note) }
}

pub const COMPANIES: TableSpec = TableSpec {
    name: "companies",
    description: "One row per listed company",
    columns: &[
        col("id", "integer"),
        col_note("ticker", "text", "unique, upper-case symbol such as 'AAPL'"),
        col("company_name", "text"),
        col("sector", "text"),
        col("industry", "text"),
        col_note("market_cap", "numeric", "USD"),
        col("description", "text"),
    ],
};

pub const ANNUAL_REPORTS: TableSpec = TableSpec {
    name: "annual_reports",
    description: "One row per company per fiscal year",
    columns: &[
        col("id", "integer"),
        col_note("company_id", "integer", "references companies.id"),
        col("fiscal_year", "integer"),
        col_note("revenue", "numeric", "USD"),
        col_note("operating_income", "numeric", "USD"),
        col_note("net_income", "numeric", "USD"),
        col("eps", "numeric"),
        col_note("total_assets", "numeric", "USD"),
        col_note("total_liabilities", "numeric", "USD"),
        col_note("shareholders_equity", "numeric", "USD"),
        col_note("operating_cash_flow", "numeric", "USD"),
    ],
};

pub const QUARTERLY_REPORTS: TableSpec = TableSpec {
    name: "quarterly_reports",
    description: "One row per company per fiscal quarter",
    columns: &[
        col("id", "integer"),
        col_note("company_id", "integer", "references companies.id"),
        col("fiscal_year", "integer"),
        col_note("fiscal_quarter", "integer", "1-4"),
        col_note("revenue", "numeric", "USD"),
        col_note("operating_income", "numeric", "USD"),
        col_note("net_income", "numeric", "USD"),
        col("eps", "numeric"),
    ],
};

pub const STOCK_PRICES: TableSpec = TableSpec {
    name: "stock_prices",
    description: "Daily OHLCV prices and valuation ratios",
    columns: &[
        col("id", "integer"),
        col_note("company_id", "integer", "references companies.id"),
        col_note("trade_date", "date", "YYYY-MM-DD"),
        col("open", "numeric"),
        col("high", "numeric"),
        col("low", "numeric"),
        col("close", "numeric"),
        col("volume", "bigint"),
        col("pe_ratio", "numeric"),
        col("pb_ratio", "numeric"),
        col("dividend_yield", "numeric"),
    ],
};

pub const COMPANY_RELATIONSHIPS: TableSpec = TableSpec {
    name: "company_relationships",
    description: "Extracted relationships between companies, matched by ticker text (no foreign key)",
    columns: &[
        col("id", "integer"),
        col("source_company", "text"),
        col("source_ticker", "text"),
        col("target_company", "text"),
        col("target_ticker", "text"),
        col_note(
            "relationship_type",
            "text",
            "partnership, acquisition, supplier, customer, competitor, subsidiary, investment",
        ),
        col_note("confidence", "numeric", "0.0-1.0"),
        col("extracted_from", "text"),
        col("filing_date", "date"),
    ],
};

pub const DOCUMENTS: TableSpec = TableSpec {
    name: "documents",
    description: "Filing and news text chunks with embeddings",
    columns: &[
        col("id", "integer"),
        col("content", "text"),
        col("metadata", "jsonb"),
        col_note("embedding", "vector", "not useful in plain SQL"),
    ],
};

/// Every table of the financial database.
pub const FINANCE_TABLES: &[TableSpec] = &[
    COMPANIES,
    ANNUAL_REPORTS,
    QUARTERLY_REPORTS,
    STOCK_PRICES,
    COMPANY_RELATIONSHIPS,
    DOCUMENTS,
];

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL_SCHEMA: &str = include_str!("../schema.sql");

    #[test]
    fn test_every_table_exists_in_local_schema() {
        for table in FINANCE_TABLES {
            let ddl = format!("CREATE TABLE IF NOT EXISTS {} (", table.name);
            assert!(LOCAL_SCHEMA.contains(&ddl), "missing DDL for {}", table.name);
        }
    }
}
