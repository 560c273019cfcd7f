//! Builds the wide enrollment table from three single-measure exports
//! (total, men, Canadian students) in the statistics agency's layout.
//!
//! Each export has some preamble lines, a header row whose first cell reads
//! "Geography and institutions" followed by academic-year columns such as
//! `2019 / 2020`, a units row, and then one row per institution. Women and
//! international counts are derived as `total - men` and `total - canadian`.

use crate::models::{Measure, INSTITUTION_COLUMN};
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use regex::Regex;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

const HEADER_MARKER: &str = "Geography and institutions";

fn metadata_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)field of study|program type|credential|registration|status|gender")
            .expect("metadata pattern compiles")
    })
}

/// One single-measure export: institution -> count per year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureTable {
    pub years: Vec<String>,
    pub rows: Vec<(String, Vec<Option<i64>>)>,
}

impl MeasureTable {
    fn value(&self, institution: &str, year: &str) -> Option<i64> {
        let column = self.years.iter().position(|y| y == year)?;
        self.rows
            .iter()
            .find(|(name, _)| name == institution)
            .and_then(|(_, values)| values.get(column).copied().flatten())
    }
}

fn clean_count(cell: &str) -> Option<i64> {
    let cleaned: String = cell.chars().filter(|c| *c != ',' && *c != '"').collect();
    let cleaned = cleaned.trim();
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        cleaned.parse().ok()
    } else {
        None
    }
}

/// Parse one export. Fails when no header row can be found.
pub fn parse_export(content: &str) -> Result<MeasureTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    // Unreadable lines are dropped; the preamble is free-form.
    let records: Vec<StringRecord> = reader.records().filter_map(|r| r.ok()).collect();

    let Some(header_index) = records
        .iter()
        .position(|record| record.iter().any(|cell| cell.contains(HEADER_MARKER)))
    else {
        bail!("could not find a \"{}\" header row", HEADER_MARKER);
    };

    let years: Vec<String> = records[header_index]
        .iter()
        .skip(1)
        .map(str::trim)
        .filter(|cell| !cell.is_empty() && cell.contains('/'))
        .map(|cell| cell.to_string())
        .collect();

    let mut rows = Vec::new();
    // The row right after the header only carries units.
    for record in records.iter().skip(header_index + 2) {
        let institution = record.get(0).unwrap_or("").trim().replace('"', "");
        if institution.is_empty() {
            continue;
        }
        if metadata_pattern().is_match(&institution) {
            debug!(%institution, "skipping metadata row");
            continue;
        }
        let values: Vec<Option<i64>> = (1..=years.len())
            .map(|column| record.get(column).and_then(clean_count))
            .collect();
        if values.iter().any(Option::is_some) {
            rows.push((institution, values));
        }
    }

    Ok(MeasureTable { years, rows })
}

pub fn read_export(path: &Path) -> Result<MeasureTable> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let table = parse_export(&content).with_context(|| format!("Failed to parse export: {}", path.display()))?;
    info!(path = %path.display(), institutions = table.rows.len(), years = table.years.len(), "read export");
    Ok(table)
}

/// The combined wide table; `values[year][measure]` follows `Measure::ALL` order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    pub years: Vec<String>,
    pub rows: Vec<(String, Vec<[Option<i64>; 5]>)>,
}

fn difference(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    Some(a? - b?)
}

/// Outer-join the three exports on institution, sorted by name.
/// Years come from the total export.
pub fn combine(total: &MeasureTable, men: &MeasureTable, canadian: &MeasureTable) -> CombinedTable {
    let mut institutions: BTreeSet<&str> = BTreeSet::new();
    for table in [total, men, canadian] {
        for (name, _) in &table.rows {
            institutions.insert(name.as_str());
        }
    }

    let rows = institutions
        .into_iter()
        .map(|institution| {
            let values = total
                .years
                .iter()
                .map(|year| {
                    let t = total.value(institution, year);
                    let m = men.value(institution, year);
                    let c = canadian.value(institution, year);
                    [t, m, difference(t, m), c, difference(t, c)]
                })
                .collect();
            (institution.to_string(), values)
        })
        .collect();

    CombinedTable {
        years: total.years.clone(),
        rows,
    }
}

impl CombinedTable {
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![INSTITUTION_COLUMN.to_string()];
        for year in &self.years {
            header.extend(Measure::ALL.iter().map(|m| m.column(year)));
        }
        header
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);
        writer.write_record(self.header())?;
        for (institution, per_year) in &self.rows {
            let mut record = vec![institution.clone()];
            for values in per_year {
                record.extend(values.iter().map(|v| v.map(|n| n.to_string()).unwrap_or_default()));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_to(file)
    }

    /// Sum of one measure over all institutions for a year, skipping gaps.
    pub fn sum(&self, year: &str, measure: Measure) -> i64 {
        let Some(column) = self.years.iter().position(|y| y == year) else {
            return 0;
        };
        let index = Measure::ALL.iter().position(|m| *m == measure).unwrap_or(0);
        self.rows
            .iter()
            .filter_map(|(_, values)| values.get(column).and_then(|v| v[index]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;
    use tempfile::tempdir;

    fn export(rows: &str) -> String {
        format!(
            "\"Postsecondary enrolments, by institution\"\n\
             \"Frequency: Annual\"\n\
             \"Geography and institutions\",\"2019 / 2020\",\"2020 / 2021\",\"Notes\"\n\
             ,\"Number\",\"Number\"\n\
             {rows}\
             \"Field of study 1\",\"5\",\"6\"\n\
             \n\
             \"Footnotes:\"\n"
        )
    }

    #[test]
    fn export_parsing_finds_header_and_cleans_values() {
        let text = export("\"Carleton University\",\"31,000\",\"..\"\n\"Empty College\",\"..\",\"x\"\n");
        let table = parse_export(&text).unwrap();
        assert_eq!(table.years, vec!["2019 / 2020", "2020 / 2021"]);
        assert_eq!(table.rows, vec![("Carleton University".to_string(), vec![Some(31000), None])]);
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(parse_export("a,b\n1,2\n").is_err());
    }

    #[test]
    fn combine_derives_women_and_international() {
        let total = parse_export(&export("\"B\",\"100\",\"120\"\n\"A\",\"50\",\"\"\n")).unwrap();
        let men = parse_export(&export("\"B\",\"40\",\"50\"\n")).unwrap();
        let canadian = parse_export(&export("\"B\",\"90\",\"100\"\n\"C\",\"7\",\"8\"\n")).unwrap();
        let combined = combine(&total, &men, &canadian);

        let names: Vec<&str> = combined.rows.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        let b = &combined.rows[1].1;
        assert_eq!(b[0], [Some(100), Some(40), Some(60), Some(90), Some(10)]);
        let a = &combined.rows[0].1;
        assert_eq!(a[0], [Some(50), None, None, None, None]);
        let c = &combined.rows[2].1;
        assert_eq!(c[1], [None, None, None, Some(8), None]);
        assert_eq!(combined.sum("2019 / 2020", Measure::Total), 150);
    }

    #[test]
    fn combined_output_loads_as_dashboard_table() {
        let total = parse_export(&export("\"B\",\"100\",\"120\"\n")).unwrap();
        let men = parse_export(&export("\"B\",\"40\",\"50\"\n")).unwrap();
        let canadian = parse_export(&export("\"B\",\"90\",\"100\"\n")).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        combine(&total, &men, &canadian).write_to_path(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Institution,Total_2019 / 2020,Men_2019 / 2020,Women_2019 / 2020"));
        let parsed = table::parse(&text).unwrap();
        assert_eq!(parsed.years(), vec!["2019 / 2020", "2020 / 2021"]);
        assert_eq!(parsed.find_row("B").unwrap()["International_2020 / 2021"], "20");
    }
}
