use crate::models::EnrollmentRecord;
use serde::Serialize;

/// A comparison record together with its display percentages.
///
/// Percentages are per record (part / record total), rounded to one decimal,
/// and `None` when the record total is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordShares {
    pub record: EnrollmentRecord,
    pub men_pct: Option<f64>,
    pub women_pct: Option<f64>,
    pub canadian_pct: Option<f64>,
    pub international_pct: Option<f64>,
}

/// Round half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn percentage(part: f64, total: f64) -> Option<f64> {
    if total == 0.0 {
        return None;
    }
    let pct = part / total * 100.0;
    pct.is_finite().then(|| round1(pct))
}

pub fn shares(record: &EnrollmentRecord) -> RecordShares {
    RecordShares {
        record: record.clone(),
        men_pct: percentage(record.men, record.total),
        women_pct: percentage(record.women, record.total),
        canadian_pct: percentage(record.canadian, record.total),
        international_pct: percentage(record.international, record.total),
    }
}

pub fn with_shares(list: &[EnrollmentRecord]) -> Vec<RecordShares> {
    list.iter().map(shares).collect()
}

/// Distance of the men share from an even split, in percentage points.
/// A zero total has no ratio and counts as infinitely far from even.
pub fn gender_deviation(record: &EnrollmentRecord) -> f64 {
    let deviation = (record.men / record.total * 100.0 - 50.0).abs();
    if deviation.is_nan() {
        f64::INFINITY
    } else {
        deviation
    }
}

/// Record with the largest total; the first of equal maxima wins.
pub fn largest_enrollment(list: &[EnrollmentRecord]) -> Option<&EnrollmentRecord> {
    let mut records = list.iter();
    let first = records.next()?;
    Some(records.fold(first, |best, current| {
        if current.total > best.total {
            current
        } else {
            best
        }
    }))
}

/// Record whose gender split is closest to 50/50; the first of equal deviations wins.
pub fn most_balanced_gender(list: &[EnrollmentRecord]) -> Option<&EnrollmentRecord> {
    let mut records = list.iter();
    let first = records.next()?;
    let (best, _) = records.fold((first, gender_deviation(first)), |(best, best_dev), current| {
        let dev = gender_deviation(current);
        if dev < best_dev {
            (current, dev)
        } else {
            (best, best_dev)
        }
    });
    Some(best)
}

/// Record with the most international students by raw count, not share.
/// The first of equal counts wins.
pub fn highest_international_share(list: &[EnrollmentRecord]) -> Option<&EnrollmentRecord> {
    let mut records = list.iter();
    let first = records.next()?;
    Some(records.fold(first, |best, current| {
        if current.international > best.international {
            current
        } else {
            best
        }
    }))
}
