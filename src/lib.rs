//! EndoMetrics Core - computation engine for dynamic ambulatory glucose
//! profile (dAGP) analytics
//!
//! The crate turns raw CGM export files into a battery of clinical
//! glycemic-variability and risk indicators through a deterministic
//! pipeline: device normalization -> window filtering -> metrics engine ->
//! period comparison.
//!
//! ## Modules
//!
//! - **Normalizer**: map a device upload (LibreLink, Dexcom, Nightscout) to
//!   the canonical glucose series
//! - **Filter**: restrict to a requested range/weekday/time-of-day window
//!   and derive the preceding baseline window
//! - **Metrics**: basic aggregates, MAGE, LBGI/HBGI/ADRR, MODD/CONGA24
//! - **Compare**: per-indicator deltas between primary and baseline windows

pub mod compare;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod types;

pub use compare::compare;
pub use error::CgmError;
pub use filter::{filter_baseline, filter_primary, FilterSpec, RangeSelector};
pub use metrics::MetricsEngine;
pub use normalizer::Normalizer;
pub use pipeline::{analyze_upload, AnalysisRequest};
pub use types::{AnalysisReport, ComparisonResult, Device, GlucoseSeries, MetricsResult, Reading};

/// Crate version embedded in every report's provenance
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report provenance
pub const PRODUCER_NAME: &str = "endometrics-core";
