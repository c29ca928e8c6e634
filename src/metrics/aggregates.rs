//! Basic aggregate indicators
//!
//! Population statistics (ddof = 0) throughout, matching the clinical
//! literature the battery is drawn from.

use std::collections::BTreeMap;

use crate::types::{BestDay, DayStatistics, GlucoseSeries};

/// Lower bound of the target range (mg/dL); readings below are hypoglycemic.
pub const HYPO_THRESHOLD: f64 = 70.0;

/// Upper bound of the target range (mg/dL); readings above are hyperglycemic.
pub const HYPER_THRESHOLD: f64 = 180.0;

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Linear-interpolated percentile over an ascending-sorted slice, `p` in 0-100.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let frac = rank - lower as f64;
    if lower + 1 < sorted.len() {
        sorted[lower] + frac * (sorted[lower + 1] - sorted[lower])
    } else {
        sorted[lower]
    }
}

pub fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 50.0)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Percentages of readings in, below, and above the target range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBreakdown {
    pub time_in_range: f64,
    pub time_hypo: f64,
    pub time_hyper: f64,
}

/// Time in `[70, 180]`, below 70, above 180, as percentages rounded to two
/// decimals. The three parts sum to 100 within rounding.
pub fn range_breakdown(values: &[f64]) -> RangeBreakdown {
    let n = values.len() as f64;
    let in_range = values
        .iter()
        .filter(|v| **v >= HYPO_THRESHOLD && **v <= HYPER_THRESHOLD)
        .count() as f64;
    let hypo = values.iter().filter(|v| **v < HYPO_THRESHOLD).count() as f64;
    let hyper = values.iter().filter(|v| **v > HYPER_THRESHOLD).count() as f64;

    RangeBreakdown {
        time_in_range: round_to(in_range / n * 100.0, 2),
        time_hypo: round_to(hypo / n * 100.0, 2),
        time_hyper: round_to(hyper / n * 100.0, 2),
    }
}

/// Glucose management index, an HbA1c estimate from mean glucose.
pub fn gmi_from_mean(mean: f64) -> f64 {
    3.31 + 0.02392 * mean
}

/// American Diabetes Association estimated HbA1c.
pub fn ea1c_from_mean(mean: f64) -> f64 {
    (46.7 + mean) / 28.7
}

/// J-index: glycemic control quality from mean and SD combined.
pub fn j_index(mean: f64, sd: f64) -> f64 {
    0.001 * (mean + sd) * (mean + sd)
}

/// Interday coefficient of variation, percent.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    population_std(values) / mean(values) * 100.0
}

fn per_day_values(series: &GlucoseSeries) -> BTreeMap<i32, Vec<f64>> {
    let mut days: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for reading in &series.readings {
        days.entry(reading.day_ordinal).or_default().push(reading.value);
    }
    days
}

fn day_statistics(per_day: &[f64]) -> DayStatistics {
    let mut sorted = per_day.to_vec();
    sorted.sort_by(f64::total_cmp);
    DayStatistics {
        mean: mean(per_day),
        median: median(&sorted),
        sd: population_std(per_day),
    }
}

/// Within-day standard deviation, summarized across all days in the window.
pub fn intraday_sd(series: &GlucoseSeries) -> DayStatistics {
    let per_day: Vec<f64> = per_day_values(series)
        .values()
        .map(|vals| population_std(vals))
        .collect();
    day_statistics(&per_day)
}

/// Within-day coefficient of variation, summarized across all days.
pub fn intraday_cv(series: &GlucoseSeries) -> DayStatistics {
    let per_day: Vec<f64> = per_day_values(series)
        .values()
        .map(|vals| coefficient_of_variation(vals))
        .collect();
    day_statistics(&per_day)
}

/// The calendar date with the lowest mean glucose, with its mean and GMI.
pub fn best_day(series: &GlucoseSeries) -> Option<BestDay> {
    let mut days: BTreeMap<chrono::NaiveDate, Vec<f64>> = BTreeMap::new();
    for reading in &series.readings {
        days.entry(reading.date).or_default().push(reading.value);
    }

    let mut best: Option<BestDay> = None;
    for (date, values) in days {
        let day_mean = mean(&values);
        let candidate = BestDay {
            date,
            mean_glucose: day_mean,
            gmi: gmi_from_mean(day_mean),
        };
        match best {
            Some(current) if current.mean_glucose <= day_mean => {}
            _ => best = Some(candidate),
        }
    }
    best
}
