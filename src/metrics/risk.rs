//! Blood glucose risk indices (LBGI, HBGI, ADRR)
//!
//! The Kovatchev risk transform maps glucose onto a symmetrized scale where
//! hypo- and hyperglycemia contribute comparable risk magnitudes:
//! `f(v) = ln(v)^1.084 - 5.381`, risk `22.77 * f(v)^2` assigned to the low
//! pool when `f(v) <= 0` and to the high pool otherwise.

use std::collections::BTreeMap;

use crate::error::CgmError;
use crate::metrics::aggregates::mean;
use crate::types::GlucoseSeries;

const RISK_SCALE: f64 = 22.77;

fn risk_transform(value: f64) -> f64 {
    value.ln().powf(1.084) - 5.381
}

/// Per-reading low and high risk pools. Readings that do not qualify for a
/// pool contribute zero to it, so both pools always have one entry per
/// reading.
fn risk_pools(values: impl Iterator<Item = f64>) -> (Vec<f64>, Vec<f64>) {
    let mut low = Vec::new();
    let mut high = Vec::new();
    for v in values {
        let f = risk_transform(v);
        let risk = RISK_SCALE * f * f;
        if f <= 0.0 {
            low.push(risk);
            high.push(0.0);
        } else {
            low.push(0.0);
            high.push(risk);
        }
    }
    (low, high)
}

/// Low blood glucose index: mean of the low-risk pool.
pub fn lbgi(series: &GlucoseSeries) -> Result<f64, CgmError> {
    let (low, _) = pools_checked(series)?;
    Ok(mean(&low))
}

/// High blood glucose index: mean of the high-risk pool.
pub fn hbgi(series: &GlucoseSeries) -> Result<f64, CgmError> {
    let (_, high) = pools_checked(series)?;
    Ok(mean(&high))
}

/// Average daily risk range: per calendar day, the worst low risk plus the
/// worst high risk, averaged across all days present.
pub fn adrr(series: &GlucoseSeries) -> Result<f64, CgmError> {
    if series.is_empty() {
        return Err(insufficient("ADRR", series.len()));
    }

    let mut days: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for reading in &series.readings {
        days.entry(reading.day_ordinal).or_default().push(reading.value);
    }

    let daily_ranges: Vec<f64> = days
        .values()
        .map(|values| {
            let (low, high) = risk_pools(values.iter().copied());
            let worst_low = low.iter().copied().fold(0.0, f64::max);
            let worst_high = high.iter().copied().fold(0.0, f64::max);
            worst_low + worst_high
        })
        .collect();

    Ok(mean(&daily_ranges))
}

fn pools_checked(series: &GlucoseSeries) -> Result<(Vec<f64>, Vec<f64>), CgmError> {
    if series.is_empty() {
        return Err(insufficient("LBGI/HBGI", series.len()));
    }
    Ok(risk_pools(series.values()))
}

fn insufficient(metric: &'static str, actual: usize) -> CgmError {
    CgmError::InsufficientData {
        metric,
        required: 1,
        actual,
    }
}
