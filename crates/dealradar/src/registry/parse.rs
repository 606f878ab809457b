//! Semicolon-delimited row handling for batch submissions and the registry file.

use crate::error::ValidationError;

use super::company::{CompanyRecord, COLUMNS};

pub const DELIMITER: char = ';';

/// Leading column name that marks a header row.
const HEADER_MARKER: &str = "company_id";

/// Splits one row into trimmed fields.
///
/// Fields may be wrapped in double quotes, in which case the delimiter is
/// literal inside them and `""` stands for a single quote character.
pub fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            c if c == DELIMITER && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Formats one row, quoting fields that would otherwise not survive a
/// round trip through [`split_row`].
pub fn format_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| {
            let needs_quotes = field.contains(DELIMITER)
                || field.contains('"')
                || field.trim() != *field;
            if needs_quotes {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Returns true if `line` is the header row.
pub fn is_header(line: &str) -> bool {
    split_row(line)
        .first()
        .is_some_and(|field| field == HEADER_MARKER)
}

/// Parses a batch submission into company records.
///
/// A header row is skipped, blank lines are ignored, and any malformed line
/// rejects the whole batch.
pub fn parse_batch(content: &str) -> Result<Vec<CompanyRecord>, ValidationError> {
    let mut lines = content.trim().lines().peekable();

    if lines.peek().is_some_and(|first| is_header(first)) {
        lines.next();
    }

    let mut companies = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let parts = split_row(line);
        if parts.len() != COLUMNS.len() {
            return Err(ValidationError::MalformedLine {
                line: line.to_string(),
            });
        }

        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(ValidationError::MissingFieldsInLine {
                line: line.to_string(),
            });
        }

        let mut parts = parts.into_iter();
        let mut next = || parts.next().unwrap_or_default();
        let company = CompanyRecord {
            company_id: next(),
            company_name: next(),
            country: next(),
            website: next(),
            ir_url: next(),
        };
        company.validate()?;
        companies.push(company);
    }

    if companies.is_empty() {
        return Err(ValidationError::Empty);
    }

    Ok(companies)
}
