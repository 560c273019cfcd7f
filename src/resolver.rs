use crate::models::{coerce_count, display_value, EnrollmentRecord, Measure, RawRow, Selection, SelectionDetails};
use crate::table::ParsedTable;

/// Resolve a pick against the table. `None` when the institution has no row,
/// which callers treat as "leave it out of the charts".
pub fn resolve(selection: &Selection, table: &ParsedTable) -> Option<EnrollmentRecord> {
    let row = table.find_row(&selection.institution)?;
    Some(record_from_row(row, &selection.institution, &selection.year))
}

pub fn record_from_row(row: &RawRow, institution: &str, year: &str) -> EnrollmentRecord {
    let value = |measure: Measure| coerce_count(row.get(&measure.column(year)).map(String::as_str));
    EnrollmentRecord {
        institution: institution.to_string(),
        year: year.to_string(),
        total: value(Measure::Total),
        men: value(Measure::Men),
        women: value(Measure::Women),
        canadian: value(Measure::Canadian),
        international: value(Measure::International),
    }
}

/// Raw cell text for a pick, without numeric coercion.
pub fn details(selection: &Selection, table: &ParsedTable) -> Option<SelectionDetails> {
    let row = table.find_row(&selection.institution)?;
    let value = |measure: Measure| display_value(row.get(&measure.column(&selection.year)).map(String::as_str));
    Some(SelectionDetails {
        institution: selection.institution.clone(),
        year: selection.year.clone(),
        total: value(Measure::Total),
        men: value(Measure::Men),
        women: value(Measure::Women),
        canadian: value(Measure::Canadian),
        international: value(Measure::International),
    })
}
