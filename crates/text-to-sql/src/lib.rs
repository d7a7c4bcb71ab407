pub mod config;
pub mod extract;
pub mod prompt;
pub mod safety;
pub mod translator;


pub use config::TranslatorConfig;
pub use extract::extract_sql;
pub use prompt::{build_prompt, SchemaContext};
pub use safety::{validate_sql, SafetyViolation, FORBIDDEN_KEYWORDS};
pub use translator::{Answer, TextToSql};
