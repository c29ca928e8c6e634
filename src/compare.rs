//! Period comparator
//!
//! Compares the primary window's indicator battery against the baseline
//! window's, producing per-indicator `primary - baseline` deltas. Each delta
//! carries the same unit and precision as the underlying indicator; nothing
//! is re-rounded here.

use crate::types::{ComparisonResult, DayStatistics, MetricsResult};

/// Per-indicator deltas between two computed batteries.
pub fn compare(primary: &MetricsResult, baseline: &MetricsResult) -> ComparisonResult {
    ComparisonResult {
        count: primary.count as i64 - baseline.count as i64,
        mean_glucose: primary.mean_glucose - baseline.mean_glucose,
        sd: primary.sd - baseline.sd,
        median: primary.median - baseline.median,
        min: primary.min - baseline.min,
        max: primary.max - baseline.max,
        q1: primary.q1 - baseline.q1,
        q3: primary.q3 - baseline.q3,
        time_in_range: primary.time_in_range - baseline.time_in_range,
        time_hypo: primary.time_hypo - baseline.time_hypo,
        time_hyper: primary.time_hyper - baseline.time_hyper,
        interquartile_range: primary.interquartile_range - baseline.interquartile_range,
        gmi: primary.gmi - baseline.gmi,
        ea1c: primary.ea1c - baseline.ea1c,
        j_index: primary.j_index - baseline.j_index,
        interday_sd: primary.interday_sd - baseline.interday_sd,
        interday_cv: primary.interday_cv - baseline.interday_cv,
        intraday_sd: delta_day_stats(&primary.intraday_sd, &baseline.intraday_sd),
        intraday_cv: delta_day_stats(&primary.intraday_cv, &baseline.intraday_cv),
        mage: delta_opt(primary.mage, baseline.mage),
        lbgi: primary.lbgi - baseline.lbgi,
        hbgi: primary.hbgi - baseline.hbgi,
        adrr: primary.adrr - baseline.adrr,
        modd: delta_opt(primary.modd, baseline.modd),
        conga24: delta_opt(primary.conga24, baseline.conga24),
    }
}

/// `None` when the indicator is undefined on either side.
fn delta_opt(primary: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    match (primary, baseline) {
        (Some(p), Some(b)) => Some(p - b),
        _ => None,
    }
}

fn delta_day_stats(primary: &DayStatistics, baseline: &DayStatistics) -> DayStatistics {
    DayStatistics {
        mean: primary.mean - baseline.mean,
        median: primary.median - baseline.median,
        sd: primary.sd - baseline.sd,
    }
}
