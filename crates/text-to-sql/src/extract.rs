use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::safety::find_keyword;

/// Keywords that may open a statement line in a completion.
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "GRANT",
    "CREATE", "REVOKE", "MERGE", "EXPLAIN", "VALUES",
];

/// Pull the SQL statement out of a model completion.
///
/// Prefers the first fenced code block. Inside it (or inside the raw text)
/// candidates start at each line led by a statement keyword, then at the
/// first `SELECT`. The first candidate that parses wins, so prose such as
/// "With the tables above..." is skipped. When none parses, the first
/// candidate is returned and the safety filter reports why. Unfenced text
/// ends at the first blank line.
pub fn extract_sql(completion: &str) -> Option<String> {
    let (body, fenced) = match fenced_block(completion) {
        Some(block) => (block, true),
        None => (completion, false),
    };

    let candidates: Vec<&str> = candidate_starts(body)
        .into_iter()
        .map(|start| {
            let statement = &body[start..];
            if fenced {
                statement.trim()
            } else {
                until_blank_line(statement).trim()
            }
        })
        .filter(|sql| !sql.is_empty())
        .collect();

    candidates
        .iter()
        .find(|sql| parses(sql))
        .or_else(|| candidates.first())
        .map(|sql| sql.to_string())
}

fn parses(sql: &str) -> bool {
    Parser::parse_sql(&GenericDialect {}, sql).is_ok_and(|statements| !statements.is_empty())
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut rest = &text[open + 3..];

    // info string such as ```sql, unless the line is the statement itself
    let first_line_end = rest.find('\n').unwrap_or(rest.len());
    let info = rest[..first_line_end].trim();
    if info.chars().all(|c| c.is_ascii_alphanumeric()) && !is_statement_keyword(info) {
        rest = &rest[first_line_end..];
    }

    let close = rest.find("```").unwrap_or(rest.len());
    Some(&rest[..close])
}

fn is_statement_keyword(word: &str) -> bool {
    STATEMENT_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(word))
}

fn candidate_starts(body: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let leading: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if is_statement_keyword(&leading) {
            starts.push(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }

    if let Some(select) = find_keyword(body, "SELECT") {
        if !starts.contains(&select) {
            starts.push(select);
        }
    }
    starts
}

fn until_blank_line(text: &str) -> &str {
    let mut end = 0;
    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            break;
        }
        end += line.len();
    }
    &text[..end]
}
