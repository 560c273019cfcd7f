use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub data_file: Option<String>,
    pub data_url: Option<String>,
    pub default_locale: String,
    pub locale_state_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "internet")]
    Internet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source_mode: DataSourceMode::Local,
            data_file: Some("assets/combined_university_enrollment.csv".to_string()),
            data_url: Some("https://example.com/assets/combined_university_enrollment.csv".to_string()),
            default_locale: "en".to_string(),
            locale_state_file: Some(".dashboard-locale.toml".to_string()),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// One parsed row: column name -> trimmed cell text.
pub type RawRow = HashMap<String, String>;

pub const INSTITUTION_COLUMN: &str = "Institution";

/// The five measures recorded per academic year in the wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Total,
    Men,
    Women,
    Canadian,
    International,
}

impl Measure {
    pub const ALL: [Measure; 5] = [
        Measure::Total,
        Measure::Men,
        Measure::Women,
        Measure::Canadian,
        Measure::International,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Measure::Total => "Total",
            Measure::Men => "Men",
            Measure::Women => "Women",
            Measure::Canadian => "Canadian",
            Measure::International => "International",
        }
    }

    /// Column name for this measure in the given year, e.g. `Men_2019 / 2020`.
    pub fn column(self, year: &str) -> String {
        format!("{}_{}", self.prefix(), year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionId(pub u64);

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub id: SelectionId,
    pub institution: String,
    pub year: String,
}

impl Selection {
    pub fn matches(&self, institution: &str, year: &str) -> bool {
        self.institution == institution && self.year == year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub institution: String,
    pub year: String,
    pub total: f64,
    pub men: f64,
    pub women: f64,
    pub canadian: f64,
    pub international: f64,
}

impl EnrollmentRecord {
    pub fn is_same_pick(&self, other: &EnrollmentRecord) -> bool {
        self.institution == other.institution && self.year == other.year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub year: String,
    pub total: f64,
}

/// Raw cell values for one pick, `"N/A"` where the cell is missing or empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionDetails {
    pub institution: String,
    pub year: String,
    pub total: String,
    pub men: String,
    pub women: String,
    pub canadian: String,
    pub international: String,
}

/// Lossy count coercion: parse the leading numeric prefix of the cell, and
/// map anything unreadable (missing, empty, `N/A`, NaN) to zero.
///
/// A missing data point is indistinguishable from a true zero after this.
pub fn coerce_count(cell: Option<&str>) -> f64 {
    let Some(text) = cell else {
        return 0.0;
    };
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut digits = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    // Exponent only counts when at least one digit follows it.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    match text[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

pub fn display_value(cell: Option<&str>) -> String {
    match cell {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => "N/A".to_string(),
    }
}

/// Cut `name` to `keep` characters and append `...` once it exceeds `limit` characters.
pub fn shorten(name: &str, limit: usize, keep: usize) -> String {
    if name.chars().count() > limit {
        let head: String = name.chars().take(keep).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Institution name as shown in the selector and selection badges.
pub fn short_institution_name(full_name: &str) -> String {
    shorten(full_name, 50, 47)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        let mut config = Config::default();
        config.data_source_mode = DataSourceMode::Internet;
        config.default_locale = "fr".to_string();
        config.save_to_file(path).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("data_source_mode = \"internet\""));
        let loaded = Config::load_from_file(path).unwrap();
        assert_eq!(loaded.data_source_mode, DataSourceMode::Internet);
        assert_eq!(loaded.default_locale, "fr");
        assert_eq!(loaded.data_file, config.data_file);
    }

    #[test]
    fn coerce_reads_plain_numbers() {
        assert_eq!(coerce_count(Some("1000")), 1000.0);
        assert_eq!(coerce_count(Some(" 3.5")), 3.5);
        assert_eq!(coerce_count(Some("-2")), -2.0);
        assert_eq!(coerce_count(Some("1e3")), 1000.0);
    }

    #[test]
    fn coerce_takes_leading_prefix() {
        assert_eq!(coerce_count(Some("12abc")), 12.0);
        assert_eq!(coerce_count(Some("1,234")), 1.0);
        assert_eq!(coerce_count(Some("7e")), 7.0);
        assert_eq!(coerce_count(Some(".5")), 0.5);
    }

    #[test]
    fn coerce_maps_unreadable_to_zero() {
        assert_eq!(coerce_count(None), 0.0);
        assert_eq!(coerce_count(Some("")), 0.0);
        assert_eq!(coerce_count(Some("N/A")), 0.0);
        assert_eq!(coerce_count(Some("..")), 0.0);
        assert_eq!(coerce_count(Some("-")), 0.0);
    }

    #[test]
    fn display_value_marks_missing() {
        assert_eq!(display_value(Some("42")), "42");
        assert_eq!(display_value(Some("")), "N/A");
        assert_eq!(display_value(None), "N/A");
    }

    #[test]
    fn short_names() {
        let long = "A".repeat(60);
        let short = short_institution_name(&long);
        assert_eq!(short.chars().count(), 50);
        assert!(short.ends_with("..."));
        assert_eq!(short_institution_name("Carleton University"), "Carleton University");
        assert_eq!(shorten("Université de Montréal", 20, 20), "Université de Montré...");
    }

    #[test]
    fn measure_columns() {
        assert_eq!(Measure::Total.column("2019 / 2020"), "Total_2019 / 2020");
        assert_eq!(Measure::International.column("2021"), "International_2021");
    }
}
