//! Metrics engine
//!
//! Computes the full glycemic-variability and risk battery for one filtered
//! series. The engine is total: once a non-empty series exists, a metric
//! that cannot be computed (MAGE below three readings, MODD/CONGA24 without
//! a valid lag bucket) is reported as `None` and never aborts the rest of
//! the battery.

pub mod aggregates;
pub mod mage;
pub mod modd;
pub mod risk;

use crate::error::CgmError;
use crate::types::{GlucoseSeries, MetricsResult};

/// Metrics engine: a pure function from filtered series to indicator battery
pub struct MetricsEngine;

impl MetricsEngine {
    /// Compute every indicator for a non-empty filtered series.
    pub fn compute(series: &GlucoseSeries) -> Result<MetricsResult, CgmError> {
        if series.is_empty() {
            return Err(CgmError::EmptyResult);
        }

        let values: Vec<f64> = series.values().collect();
        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);

        let mean = aggregates::mean(&values);
        let sd = aggregates::population_std(&values);
        let q1 = aggregates::percentile(&sorted, 25.0);
        let q3 = aggregates::percentile(&sorted, 75.0);
        let breakdown = aggregates::range_breakdown(&values);

        let best_day = aggregates::best_day(series).ok_or(CgmError::EmptyResult)?;

        Ok(MetricsResult {
            count: series.len(),
            start_date: series.readings[0].date,
            end_date: series.readings[series.len() - 1].date,
            mean_glucose: mean,
            sd,
            median: aggregates::median(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            q1,
            q3,
            time_in_range: breakdown.time_in_range,
            time_hypo: breakdown.time_hypo,
            time_hyper: breakdown.time_hyper,
            interquartile_range: q3 - q1,
            gmi: aggregates::gmi_from_mean(mean),
            ea1c: aggregates::ea1c_from_mean(mean),
            j_index: aggregates::j_index(mean, sd),
            interday_sd: sd,
            interday_cv: aggregates::coefficient_of_variation(&values),
            intraday_sd: aggregates::intraday_sd(series),
            intraday_cv: aggregates::intraday_cv(series),
            mage: mage::mage(series).ok(),
            lbgi: risk::lbgi(series)?,
            hbgi: risk::hbgi(series)?,
            adrr: risk::adrr(series)?,
            modd: modd::modd(series),
            conga24: modd::conga24(series),
            best_day,
        })
    }
}
