//! Same-time-of-day agreement metrics (MODD, CONGA24)
//!
//! Readings are bucketed by minute-of-day; each bucket's score is the mean
//! absolute difference between temporally consecutive readings at that clock
//! time, i.e. across successive days. MODD and CONGA24 are the first and
//! second moments of the same bucket-score set.

use std::collections::BTreeMap;

use crate::metrics::aggregates::{mean, population_std};
use crate::types::GlucoseSeries;

/// Mean absolute consecutive difference per minute-of-day bucket.
///
/// Buckets with fewer than two members (difference undefined) or a mean of
/// exactly zero are treated as missing and excluded. Sparse or irregular
/// sampling legitimately excludes many buckets.
fn bucket_scores(series: &GlucoseSeries) -> Vec<f64> {
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for reading in &series.readings {
        buckets
            .entry(reading.minute_of_day)
            .or_default()
            .push(reading.value);
    }

    buckets
        .values()
        .filter(|members| members.len() >= 2)
        .filter_map(|members| {
            let diffs: Vec<f64> = members.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
            let score = mean(&diffs);
            if score == 0.0 {
                None
            } else {
                Some(score)
            }
        })
        .collect()
}

/// Mean of daily differences. `None` when no bucket qualifies.
pub fn modd(series: &GlucoseSeries) -> Option<f64> {
    let scores = bucket_scores(series);
    if scores.is_empty() {
        None
    } else {
        Some(mean(&scores))
    }
}

/// Continuous overall net glycemic action over 24 hours: population standard
/// deviation of the same bucket scores MODD averages. `None` when no bucket
/// qualifies.
pub fn conga24(series: &GlucoseSeries) -> Option<f64> {
    let scores = bucket_scores(series);
    if scores.is_empty() {
        None
    } else {
        Some(population_std(&scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reading;
    use chrono::NaiveDate;

    fn reading(day: u32, hour: u32, minute: u32, value: f64) -> Reading {
        Reading::new(
            NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
            value,
        )
    }

    #[test]
    fn test_modd_and_conga24_over_two_buckets() {
        let series = GlucoseSeries::from_readings(vec![
            // 08:00 bucket: diffs 20 and 10 -> mean 15
            reading(1, 8, 0, 100.0),
            // 09:00 bucket: diff 5 -> mean 5
            reading(1, 9, 0, 100.0),
            // 10:00 bucket: identical values -> mean 0, excluded
            reading(1, 10, 0, 100.0),
            // 11:00 bucket: single member, excluded
            reading(1, 11, 0, 100.0),
            reading(2, 8, 0, 120.0),
            reading(2, 9, 0, 105.0),
            reading(2, 10, 0, 100.0),
            reading(3, 8, 0, 110.0),
        ]);

        assert_eq!(modd(&series), Some(10.0));
        assert_eq!(conga24(&series), Some(5.0));
    }

    #[test]
    fn test_all_buckets_excluded_yields_none() {
        // a flat profile zeroes every bucket
        let series = GlucoseSeries::from_readings(vec![
            reading(1, 8, 0, 100.0),
            reading(2, 8, 0, 100.0),
            reading(3, 8, 0, 100.0),
        ]);

        assert_eq!(modd(&series), None);
        assert_eq!(conga24(&series), None);
    }

    #[test]
    fn test_single_day_has_no_lag_pairs() {
        let series = GlucoseSeries::from_readings(vec![
            reading(1, 8, 0, 100.0),
            reading(1, 8, 5, 120.0),
            reading(1, 8, 10, 90.0),
        ]);

        assert_eq!(modd(&series), None);
    }

    #[test]
    fn test_seconds_round_into_the_same_bucket() {
        // 08:00:29 rounds down, 07:59:31 rounds up: all three land in the
        // 08:00 bucket
        let mk = |day: u32, h: u32, m: u32, s: u32, v: f64| {
            Reading::new(
                NaiveDate::from_ymd_opt(2024, 1, day)
                    .unwrap()
                    .and_hms_opt(h, m, s)
                    .unwrap(),
                v,
            )
        };
        let series = GlucoseSeries::from_readings(vec![
            mk(1, 8, 0, 29, 100.0),
            mk(2, 7, 59, 31, 110.0),
            mk(3, 8, 0, 0, 130.0),
        ]);

        assert_eq!(modd(&series), Some(15.0));
    }
}
