use crate::error::{ParseError, RowParseWarning};
use crate::models::{RawRow, INSTITUTION_COLUMN};
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A wide enrollment table: one `Institution` column plus `{Measure}_{Year}` columns.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub warnings: Vec<RowParseWarning>,
}

impl ParsedTable {
    /// Distinct non-empty institution names, ascending.
    pub fn institutions(&self) -> Vec<String> {
        institutions(&self.rows)
    }

    /// Years that have a `Total_` column, ascending.
    pub fn years(&self) -> Vec<String> {
        years(&self.columns)
    }

    /// First row for the institution, if any.
    pub fn find_row(&self, institution: &str) -> Option<&RawRow> {
        self.rows
            .iter()
            .find(|row| row.get(INSTITUTION_COLUMN).map(String::as_str) == Some(institution))
    }
}

/// Parse delimited text with a header row.
///
/// Row-level problems are collected in `warnings`; only a table with no
/// readable header (or no `Institution` column) is an error.
pub fn parse(raw_text: &str) -> Result<ParsedTable, ParseError> {
    if raw_text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw_text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Malformed(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if columns.iter().all(|c| c.is_empty()) {
        return Err(ParseError::EmptyInput);
    }
    if !columns.iter().any(|c| c == INSTITUTION_COLUMN) {
        return Err(ParseError::MissingInstitutionColumn);
    }

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    // A repeated header keeps its first column; later copies are ignored.
    let mut seen = BTreeSet::new();
    for column in &columns {
        if !column.is_empty() && !seen.insert(column.as_str()) {
            warnings.push(RowParseWarning {
                line: 1,
                message: format!("duplicate column {:?}; only the first is used", column),
            });
        }
    }

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                warnings.push(RowParseWarning {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Blank lines come through as a single empty field.
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        if record.len() > columns.len() {
            warnings.push(RowParseWarning {
                line,
                message: format!(
                    "row has {} fields, expected {}; extra fields ignored",
                    record.len(),
                    columns.len()
                ),
            });
        }

        let mut row = RawRow::new();
        for (column, value) in columns.iter().zip(record.iter()) {
            row.entry(column.clone()).or_insert_with(|| value.to_string());
        }

        match row.get(INSTITUTION_COLUMN) {
            Some(name) if !name.is_empty() => rows.push(row),
            _ => warnings.push(RowParseWarning {
                line,
                message: "row has no institution name".to_string(),
            }),
        }
    }

    for warning in &warnings {
        debug!(%warning, "skipped or truncated row");
    }
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "table parsed with row warnings");
    }
    info!(rows = rows.len(), columns = columns.len(), "parsed enrollment table");

    Ok(ParsedTable {
        columns,
        rows,
        warnings,
    })
}

pub fn institutions(rows: &[RawRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(INSTITUTION_COLUMN))
        .filter(|name| !name.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Only a `Total_{Year}` column makes a year selectable.
pub fn years(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter_map(|column| column.strip_prefix("Total_"))
        .filter(|year| !year.is_empty())
        .map(|year| year.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
