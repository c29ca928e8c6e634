//! Error types for EndoMetrics

use chrono::NaiveTime;
use thiserror::Error;

/// Errors that can occur during ingestion, filtering, or computation
#[derive(Debug, Error)]
pub enum CgmError {
    /// The upload does not match the declared device profile. Always fatal
    /// to the request.
    #[error("{device} upload does not match the expected format: {reason}")]
    Format {
        device: &'static str,
        reason: String,
    },

    /// The requested primary window contains zero readings after all filters.
    #[error("no readings remain in the requested window after filtering")]
    EmptyResult,

    /// A metric was invoked on a series with too few readings. The metrics
    /// engine converts this into an undefined (`None`) value for the metric;
    /// it only reaches callers that invoke the metric directly.
    #[error("{metric} requires at least {required} readings, got {actual}")]
    InsufficientData {
        metric: &'static str,
        required: usize,
        actual: usize,
    },

    /// A time-of-day window with `start > end` was requested. Overnight
    /// windows are not supported and are never reinterpreted as wrap-around.
    #[error("time-of-day window start {start} is after end {end}")]
    InvalidTimeWindow { start: NaiveTime, end: NaiveTime },
}
