pub mod accessor;
pub mod companies;
pub mod config;
pub mod db;
pub mod graph;
pub mod models;
mod rows;
pub mod schema;

pub use accessor::SqlRowSource;
pub use companies::{CompanyDirectory, MAX_SEARCH_RESULTS};
pub use config::StoreConfig;
pub use db::FinanceDb;
pub use graph::{RelationshipGraph, MAX_GRAPH_DEPTH};
pub use models::*;
pub use schema::{ColumnSpec, TableSpec, FINANCE_TABLES};
