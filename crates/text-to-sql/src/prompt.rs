use analyst_core::Prompt;
use anyhow::{Context, Result};
use fin_store::{TableSpec, FINANCE_TABLES};
use std::fmt::Write as _;
use std::path::Path;

/// Schema description handed to the model. Built once, constant across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaContext {
    text: String,
}

impl SchemaContext {
    /// Describe the financial tables known to the store.
    pub fn finance() -> Self {
        Self::from_tables(FINANCE_TABLES)
    }

    pub fn from_tables(tables: &[TableSpec]) -> Self {
        let mut text = String::new();
        for table in tables {
            let _ = writeln!(text, "Table {} -- {}", table.name, table.description);
            for column in table.columns {
                match column.note {
                    Some(note) => {
                        let _ = writeln!(text, "  {} {} ({})", column.name, column.sql_type, note);
                    }
                    None => {
                        let _ = writeln!(text, "  {} {}", column.name, column.sql_type);
                    }
                }
            }
            text.push('\n');
        }
        Self::from_text(text)
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    /// Load a hand-written description, e.g. a DDL dump.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema context from {}", path.display()))?;
        anyhow::ensure!(!text.trim().is_empty(), "Schema context file {} is empty", path.display());
        Ok(Self::from_text(text))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

pub fn build_prompt(schema: &SchemaContext, dialect: &str, question: &str) -> Prompt {
    let system = format!(
        "You translate questions about company financials into SQL for a {dialect} database.\n\
         Reply with exactly one read-only SELECT statement (WITH clauses are allowed) and nothing else: \
         no explanation, no comments, no second statement.\n\
         Never modify data or schema. Use only the tables and columns below. \
         Tickers are stored upper-case. Amounts are in USD.\n\n\
         Schema:\n{schema}",
        dialect = dialect,
        schema = schema.as_str(),
    );
    let user = format!("Question: {}\nSQL:", question.trim());
    Prompt::new(system, user)
}
