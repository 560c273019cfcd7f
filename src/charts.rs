use crate::aggregate::{
    gender_deviation, highest_international_share, largest_enrollment, most_balanced_gender, shares,
};
use crate::dataset::DerivedDatasets;
use crate::models::{shorten, EnrollmentRecord};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{self, Write};

fn bar_label(record: &EnrollmentRecord, keep: usize) -> String {
    format!("{} ({})", shorten(&record.institution, keep, keep), record.year)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentBar {
    pub label: String,
    pub institution: String,
    pub year: String,
    pub total: f64,
    pub is_largest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentBarChart {
    pub highlight: Option<String>,
    pub axis_max: f64,
    pub bars: Vec<EnrollmentBar>,
}

impl EnrollmentBarChart {
    pub fn from_records(records: &[EnrollmentRecord]) -> Self {
        let largest = largest_enrollment(records);
        let max_total = largest.map(|r| r.total.trunc()).unwrap_or(0.0).max(0.0);
        // Nothing is highlighted unless some bar is above zero.
        let highlight = largest
            .filter(|_| max_total > 0.0)
            .map(|r| r.institution.clone());
        let bars = records
            .iter()
            .map(|record| EnrollmentBar {
                label: bar_label(record, 20),
                institution: record.institution.clone(),
                year: record.year.clone(),
                total: record.total.trunc(),
                // Every bar of the top institution is highlighted, not just the winning year.
                is_largest: highlight.as_deref() == Some(record.institution.as_str()),
            })
            .collect();
        Self {
            highlight,
            axis_max: (max_total * 1.1).ceil(),
            bars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub institution: String,
    pub label: String,
}

/// One axis point; `values` lines up with `TrendChart::series`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub year: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub series: Vec<TrendSeries>,
    pub rows: Vec<TrendRow>,
}

impl TrendChart {
    pub fn from_datasets(datasets: &DerivedDatasets) -> Self {
        let years: BTreeSet<&str> = datasets
            .time_series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.year.as_str()))
            .collect();

        let series = datasets
            .time_series
            .iter()
            .map(|s| TrendSeries {
                institution: s.institution.clone(),
                label: shorten(&s.institution, 25, 22),
            })
            .collect();

        let rows = years
            .into_iter()
            .map(|year| TrendRow {
                year: year.to_string(),
                values: datasets
                    .time_series
                    .iter()
                    .map(|s| s.points.iter().find(|p| p.year == year).map(|p| p.total))
                    .collect(),
            })
            .collect();

        Self { series, rows }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderBar {
    pub label: String,
    pub institution: String,
    pub year: String,
    pub total: f64,
    pub men: f64,
    pub women: f64,
    pub men_pct: Option<f64>,
    pub women_pct: Option<f64>,
    /// Distance from an even split; `None` when the total is zero.
    pub deviation: Option<f64>,
    pub is_most_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderChart {
    pub highlight: Option<String>,
    pub bars: Vec<GenderBar>,
}

impl GenderChart {
    pub fn from_records(records: &[EnrollmentRecord]) -> Self {
        let balanced = most_balanced_gender(records);
        let bars = records
            .iter()
            .map(|record| {
                let pct = shares(record);
                let deviation = gender_deviation(record);
                GenderBar {
                    label: bar_label(record, 15),
                    institution: record.institution.clone(),
                    year: record.year.clone(),
                    total: record.total,
                    men: record.men,
                    women: record.women,
                    men_pct: pct.men_pct,
                    women_pct: pct.women_pct,
                    deviation: deviation.is_finite().then_some(deviation),
                    is_most_balanced: balanced.is_some_and(|b| b.is_same_pick(record)),
                }
            })
            .collect();
        Self {
            highlight: balanced.map(|r| r.institution.clone()),
            bars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentTypeBar {
    pub label: String,
    pub institution: String,
    pub year: String,
    pub total: f64,
    pub canadian: f64,
    pub international: f64,
    pub canadian_pct: Option<f64>,
    pub international_pct: Option<f64>,
    pub is_highest_international: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentTypeChart {
    pub highlight: Option<String>,
    pub bars: Vec<StudentTypeBar>,
}

impl StudentTypeChart {
    pub fn from_records(records: &[EnrollmentRecord]) -> Self {
        let top = highest_international_share(records);
        let bars = records
            .iter()
            .map(|record| {
                let pct = shares(record);
                StudentTypeBar {
                    label: bar_label(record, 15),
                    institution: record.institution.clone(),
                    year: record.year.clone(),
                    total: record.total,
                    canadian: record.canadian,
                    international: record.international,
                    canadian_pct: pct.canadian_pct,
                    international_pct: pct.international_pct,
                    is_highest_international: top.is_some_and(|t| t.is_same_pick(record)),
                }
            })
            .collect();
        Self {
            highlight: top.map(|r| r.institution.clone()),
            bars,
        }
    }
}

/// The four chart inputs handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardCharts {
    pub enrollment: EnrollmentBarChart,
    pub trend: TrendChart,
    pub gender: GenderChart,
    pub student_type: StudentTypeChart,
}

impl DashboardCharts {
    /// `None` when nothing resolved: no chart is shown at all in that case.
    pub fn from_datasets(datasets: &DerivedDatasets) -> Option<Self> {
        let records = &datasets.comparison_list;
        if records.is_empty() {
            return None;
        }
        Some(Self {
            enrollment: EnrollmentBarChart::from_records(records),
            trend: TrendChart::from_datasets(datasets),
            gender: GenderChart::from_records(records),
            student_type: StudentTypeChart::from_records(records),
        })
    }
}

/// Rendering collaborator.
pub trait ChartSink {
    fn render(&mut self, charts: &DashboardCharts) -> io::Result<()>;
}

/// Writes chart inputs as pretty-printed JSON.
pub struct JsonChartSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonChartSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChartSink for JsonChartSink<W> {
    fn render(&mut self, charts: &DashboardCharts) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, charts)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::build;
    use crate::models::{Selection, SelectionId};
    use crate::table::parse;

    const TABLE: &str = "\
Institution,Total_2019,Men_2019,Women_2019,Canadian_2019,International_2019,Total_2020,Men_2020,Women_2020,Canadian_2020,International_2020
Alpha University of Very Long Names,100,50,50,90,10,200,90,110,150,50
Beta,150,60,90,100,50,,,,,
";

    fn datasets(picks: &[(&str, &str)]) -> DerivedDatasets {
        let table = parse(TABLE).unwrap();
        let selections: Vec<Selection> = picks
            .iter()
            .enumerate()
            .map(|(i, (inst, year))| Selection {
                id: SelectionId(i as u64 + 1),
                institution: inst.to_string(),
                year: year.to_string(),
            })
            .collect();
        build(&selections, &table, &table.years()).unwrap()
    }

    #[test]
    fn enrollment_chart_highlights_every_bar_of_top_institution() {
        let data = datasets(&[
            ("Alpha University of Very Long Names", "2020"),
            ("Beta", "2019"),
            ("Alpha University of Very Long Names", "2019"),
        ]);
        let chart = EnrollmentBarChart::from_records(&data.comparison_list);
        assert_eq!(chart.highlight.as_deref(), Some("Alpha University of Very Long Names"));
        assert_eq!(chart.axis_max, (200.0_f64 * 1.1).ceil());
        assert_eq!(chart.bars[0].label, "Alpha University of ... (2020)");
        let flags: Vec<bool> = chart.bars.iter().map(|b| b.is_largest).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn enrollment_chart_without_positive_totals_has_no_highlight() {
        let table = parse("Institution,Total_2019,Men_2019\nA,,5\nB,0,7\n").unwrap();
        let selections: Vec<Selection> = [("A", 1), ("B", 2)]
            .iter()
            .map(|(inst, id)| Selection {
                id: SelectionId(*id),
                institution: inst.to_string(),
                year: "2019".to_string(),
            })
            .collect();
        let data = build(&selections, &table, &table.years()).unwrap();
        let chart = EnrollmentBarChart::from_records(&data.comparison_list);
        assert_eq!(chart.highlight, None);
        assert!(chart.bars.iter().all(|b| !b.is_largest));
        assert_eq!(chart.axis_max, 0.0);
        assert_eq!(chart.bars.len(), 2);
    }

    #[test]
    fn trend_chart_pivots_by_year_with_gaps() {
        let data = datasets(&[("Alpha University of Very Long Names", "2020"), ("Beta", "2019")]);
        let chart = TrendChart::from_datasets(&data);
        assert_eq!(chart.series[0].label, "Alpha University of Ve...");
        assert_eq!(chart.series[1].label, "Beta");
        assert_eq!(chart.rows.len(), 2);
        assert_eq!(chart.rows[0].year, "2019");
        assert_eq!(chart.rows[0].values, vec![Some(100.0), Some(150.0)]);
        assert_eq!(chart.rows[1].values, vec![Some(200.0), None]);
    }

    #[test]
    fn gender_and_student_type_flags_match_one_pick() {
        let data = datasets(&[
            ("Alpha University of Very Long Names", "2019"),
            ("Alpha University of Very Long Names", "2020"),
            ("Beta", "2019"),
        ]);
        let gender = GenderChart::from_records(&data.comparison_list);
        let balanced: Vec<bool> = gender.bars.iter().map(|b| b.is_most_balanced).collect();
        assert_eq!(balanced, vec![true, false, false]);
        assert_eq!(gender.bars[2].men_pct, Some(40.0));
        assert_eq!(gender.bars[0].label, "Alpha Universit... (2019)");

        let types = StudentTypeChart::from_records(&data.comparison_list);
        let top: Vec<bool> = types.bars.iter().map(|b| b.is_highest_international).collect();
        // 2020 Alpha and Beta tie at 50 international students; the first one wins.
        assert_eq!(top, vec![false, true, false]);
        assert_eq!(types.bars[2].international_pct, Some(33.3));
    }

    #[test]
    fn zero_total_bar_has_no_ratio() {
        let data = datasets(&[("Beta", "2020")]);
        let gender = GenderChart::from_records(&data.comparison_list);
        assert_eq!(gender.bars[0].deviation, None);
        assert_eq!(gender.bars[0].men_pct, None);
    }

    #[test]
    fn no_resolved_records_means_no_charts() {
        let data = datasets(&[("Gone", "2019")]);
        assert!(DashboardCharts::from_datasets(&data).is_none());
    }

    #[test]
    fn json_sink_writes_all_four_charts() {
        let data = datasets(&[("Beta", "2019")]);
        let charts = DashboardCharts::from_datasets(&data).unwrap();
        let mut sink = JsonChartSink::new(Vec::new());
        sink.render(&charts).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        for key in ["enrollment", "trend", "gender", "student_type"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["enrollment"]["bars"][0]["total"], 150.0);
    }
}
