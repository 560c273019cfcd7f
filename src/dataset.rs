use crate::models::{coerce_count, EnrollmentRecord, Measure, RawRow, Selection, TimePoint};
use crate::resolver::resolve;
use crate::table::ParsedTable;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionSeries {
    pub institution: String,
    pub points: Vec<TimePoint>,
}

/// Everything the four charts are built from, regenerated on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedDatasets {
    pub comparison_list: Vec<EnrollmentRecord>,
    pub time_series: Vec<InstitutionSeries>,
    pub institutions_in_play: Vec<String>,
    pub years_in_play: Vec<String>,
}

impl DerivedDatasets {
    pub fn series(&self, institution: &str) -> Option<&[TimePoint]> {
        self.time_series
            .iter()
            .find(|s| s.institution == institution)
            .map(|s| s.points.as_slice())
    }
}

/// Fan the selections out into chart datasets. `None` for zero selections.
///
/// Selections whose institution has no row are dropped from the comparison
/// list and get no series.
pub fn build(selections: &[Selection], table: &ParsedTable, years: &[String]) -> Option<DerivedDatasets> {
    if selections.is_empty() {
        return None;
    }

    let comparison_list: Vec<EnrollmentRecord> = selections
        .iter()
        .filter_map(|selection| {
            let record = resolve(selection, table);
            if record.is_none() {
                debug!(id = %selection.id, institution = %selection.institution, "selection not resolvable, dropped");
            }
            record
        })
        .collect();

    let mut institutions_in_play: Vec<String> = Vec::new();
    for selection in selections {
        if !institutions_in_play.contains(&selection.institution) {
            institutions_in_play.push(selection.institution.clone());
        }
    }

    let time_series = institutions_in_play
        .iter()
        .filter_map(|institution| {
            table.find_row(institution).map(|row| InstitutionSeries {
                institution: institution.clone(),
                points: time_series_for_row(row, years),
            })
        })
        .collect();

    Some(DerivedDatasets {
        comparison_list,
        time_series,
        institutions_in_play,
        years_in_play: years.to_vec(),
    })
}

/// Totals across every catalog year, keeping only years with a positive total.
pub fn time_series_for_row(row: &RawRow, years: &[String]) -> Vec<TimePoint> {
    years
        .iter()
        .map(|year| TimePoint {
            year: year.clone(),
            total: coerce_count(row.get(&Measure::Total.column(year)).map(String::as_str)),
        })
        .filter(|point| point.total > 0.0)
        .collect()
}
