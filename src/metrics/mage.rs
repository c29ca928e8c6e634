//! Mean amplitude of glycemic excursions (MAGE)
//!
//! MAGE scores major glucose swings while excluding minor ones. Candidate
//! extrema come from sign changes of the first difference; runs of same-type
//! extrema within the lag are collapsed to the clinically extreme member
//! (highest of a peak pair, lowest of a valley pair) before the amplitude
//! normalization.

use std::collections::BTreeSet;

use crate::error::CgmError;
use crate::metrics::aggregates::round_to;
use crate::types::GlucoseSeries;

/// Collapse lag for adjacent same-type extrema
pub const DEFAULT_LAG: usize = 1;

/// Below this many surviving turning points every candidate extremum counts
const MIN_TURNING_POINTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtremumKind {
    Peak,
    Valley,
}

#[derive(Debug, Clone, Copy)]
struct Extremum {
    value: f64,
    kind: ExtremumKind,
}

/// MAGE with the default collapse lag, rounded to three decimals.
///
/// A series with fewer than three readings has no second difference and
/// yields [`CgmError::InsufficientData`]; the metrics engine reports that as
/// an undefined value. A series with no local extrema has no excursions and
/// scores zero.
pub fn mage(series: &GlucoseSeries) -> Result<f64, CgmError> {
    mage_with_lag(series, DEFAULT_LAG)
}

pub fn mage_with_lag(series: &GlucoseSeries, lag: usize) -> Result<f64, CgmError> {
    let n = series.len();
    if n < 3 {
        return Err(CgmError::InsufficientData {
            metric: "MAGE",
            required: 3,
            actual: n,
        });
    }

    let values: Vec<f64> = series.values().collect();
    let candidates = candidate_extrema(&values);
    if candidates.is_empty() {
        return Ok(0.0);
    }

    // Collapse runs of same-type extrema within the lag, deduplicating by
    // original index.
    let mut kept: BTreeSet<usize> = BTreeSet::new();
    for i in lag..candidates.len().saturating_sub(lag) {
        for (a, b) in [(i - lag, i), (i, i + lag)] {
            if candidates[a].kind != candidates[b].kind {
                continue;
            }
            let keep = match candidates[a].kind {
                ExtremumKind::Peak => {
                    if candidates[a].value >= candidates[b].value {
                        a
                    } else {
                        b
                    }
                }
                ExtremumKind::Valley => {
                    if candidates[a].value <= candidates[b].value {
                        a
                    } else {
                        b
                    }
                }
            };
            kept.insert(keep);
        }
    }

    let (turning_sum, excursion_count) = if kept.len() < MIN_TURNING_POINTS {
        let sum: f64 = candidates.iter().map(|c| c.value).sum();
        (sum, candidates.len() as f64)
    } else {
        let sum: f64 = kept.iter().map(|&i| candidates[i].value).sum();
        (sum, candidates.len() as f64 / 2.0)
    };

    Ok(round_to(turning_sum / excursion_count, 3))
}

/// Index-ordered local extrema from first-difference sign changes.
fn candidate_extrema(values: &[f64]) -> Vec<Extremum> {
    let signs: Vec<i32> = values
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if d > 0.0 {
                1
            } else if d < 0.0 {
                -1
            } else {
                0
            }
        })
        .collect();

    let mut candidates = Vec::new();
    for i in 0..signs.len().saturating_sub(1) {
        let change = signs[i + 1] - signs[i];
        if change == 0 {
            continue;
        }
        let kind = if change < 0 {
            ExtremumKind::Peak
        } else {
            ExtremumKind::Valley
        };
        candidates.push(Extremum {
            value: values[i + 1],
            kind,
        });
    }
    candidates
}
