//! Core types for the EndoMetrics pipeline
//!
//! This module defines the data that flows through each stage of the
//! pipeline: device profiles, the canonical glucose series, the computed
//! metrics battery, and the report envelope handed to the consumer.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device identifier for uploads and provenance tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Libre,
    Dexcom,
    Nightscout,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Libre => "LibreLink",
            Device::Dexcom => "Dexcom",
            Device::Nightscout => "Nightscout",
        }
    }

    /// Column mapping and parsing rules for this device's export format.
    pub fn profile(&self) -> DeviceProfile {
        match self {
            Device::Libre => DeviceProfile {
                value_column: ColumnLocator::FromStart(4),
                timestamp_column: ColumnLocator::FromStart(2),
                delimiter: b',',
                header_rows: 1,
                timestamp_format: TimestampFormat::Declared("%m-%d-%Y %I:%M %p"),
            },
            Device::Dexcom => DeviceProfile {
                value_column: ColumnLocator::FromStart(7),
                timestamp_column: ColumnLocator::FromStart(1),
                delimiter: b',',
                header_rows: 1,
                timestamp_format: TimestampFormat::Auto,
            },
            Device::Nightscout => DeviceProfile {
                value_column: ColumnLocator::FromEnd(2),
                timestamp_column: ColumnLocator::FromStart(3),
                delimiter: b';',
                header_rows: 1,
                timestamp_format: TimestampFormat::Auto,
            },
        }
    }
}

/// Position of a semantic column within a delimited record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLocator {
    /// Zero-based offset from the first field
    FromStart(usize),
    /// Offset from the last field; `FromEnd(1)` is the final field
    FromEnd(usize),
}

impl ColumnLocator {
    /// Resolve to a concrete index for a record of `width` fields.
    pub fn resolve(&self, width: usize) -> Option<usize> {
        match *self {
            ColumnLocator::FromStart(i) if i < width => Some(i),
            ColumnLocator::FromEnd(i) if i >= 1 && i <= width => Some(width - i),
            _ => None,
        }
    }
}

/// Timestamp parsing rule declared by a device profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Exact strftime format; a mismatching timestamp is a format error
    Declared(&'static str),
    /// Try a set of common ISO-like layouts
    Auto,
}

/// Everything the normalizer needs to know about one device's export format
#[derive(Debug, Clone, Copy)]
pub struct DeviceProfile {
    pub value_column: ColumnLocator,
    pub timestamp_column: ColumnLocator,
    pub delimiter: u8,
    pub header_rows: usize,
    pub timestamp_format: TimestampFormat,
}

/// One glucose measurement with fields derived once at normalization time
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Device-local timestamp, minute resolution
    pub timestamp: NaiveDateTime,
    /// Glucose concentration (mg/dL), positive and finite
    pub value: f64,
    /// Days from CE; unique per calendar day across month boundaries
    pub day_ordinal: i32,
    pub weekday: Weekday,
    pub hour: u32,
    pub date: NaiveDate,
    /// Minutes from midnight, 0-1439, seconds rounded to the nearest minute
    pub minute_of_day: u32,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        let date = timestamp.date();
        let rounded = timestamp.hour() * 60
            + timestamp.minute()
            + if timestamp.second() >= 30 { 1 } else { 0 };
        Self {
            timestamp,
            value,
            day_ordinal: date.num_days_from_ce(),
            weekday: timestamp.weekday(),
            hour: timestamp.hour(),
            date,
            minute_of_day: rounded % 1440,
        }
    }
}

/// Canonical glucose series: unique timestamps, strictly ascending
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlucoseSeries {
    pub readings: Vec<Reading>,
}

impl GlucoseSeries {
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().map(|r| r.value)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.readings.last().map(|r| r.timestamp)
    }

    /// New independent series holding the readings that satisfy `keep`.
    pub fn retain_readings<F>(&self, keep: F) -> GlucoseSeries
    where
        F: Fn(&Reading) -> bool,
    {
        GlucoseSeries {
            readings: self.readings.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// Mean/median/std of a per-day statistic across all days in a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayStatistics {
    pub mean: f64,
    pub median: f64,
    pub sd: f64,
}

/// The calendar date with the lowest mean glucose in a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestDay {
    pub date: NaiveDate,
    pub mean_glucose: f64,
    pub gmi: f64,
}

/// Full indicator battery for one filtered series.
///
/// Metrics that cannot be computed for a given series (MAGE below three
/// readings, MODD/CONGA24 without any valid minute-of-day bucket) are `None`;
/// the rest of the battery is always present for a non-empty series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mean_glucose: f64,
    pub sd: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    /// Percentage of readings in [70, 180] mg/dL, 2 decimals
    pub time_in_range: f64,
    /// Percentage of readings below 70 mg/dL, 2 decimals
    pub time_hypo: f64,
    /// Percentage of readings above 180 mg/dL, 2 decimals
    pub time_hyper: f64,
    pub interquartile_range: f64,
    pub gmi: f64,
    pub ea1c: f64,
    pub j_index: f64,
    pub interday_sd: f64,
    pub interday_cv: f64,
    pub intraday_sd: DayStatistics,
    pub intraday_cv: DayStatistics,
    pub mage: Option<f64>,
    pub lbgi: f64,
    pub hbgi: f64,
    pub adrr: f64,
    pub modd: Option<f64>,
    pub conga24: Option<f64>,
    pub best_day: BestDay,
}

/// Per-indicator `primary - baseline` deltas.
///
/// A delta is `None` when the indicator is undefined on either side. Date
/// span and best-day are window descriptors, not indicators, and carry no
/// delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub count: i64,
    pub mean_glucose: f64,
    pub sd: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub time_in_range: f64,
    pub time_hypo: f64,
    pub time_hyper: f64,
    pub interquartile_range: f64,
    pub gmi: f64,
    pub ea1c: f64,
    pub j_index: f64,
    pub interday_sd: f64,
    pub interday_cv: f64,
    pub intraday_sd: DayStatistics,
    pub intraday_cv: DayStatistics,
    pub mage: Option<f64>,
    pub lbgi: f64,
    pub hbgi: f64,
    pub adrr: f64,
    pub modd: Option<f64>,
    pub conga24: Option<f64>,
}

/// Report provenance stamped on every analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub producer: String,
    pub version: String,
    pub request_id: Uuid,
    pub computed_at: DateTime<Utc>,
}

/// Top-level pipeline output consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub provenance: Provenance,
    pub device: Device,
    pub primary: MetricsResult,
    /// Present only when a finite range produced a non-empty baseline window
    pub baseline: Option<MetricsResult>,
    /// Present exactly when `baseline` is
    pub comparison: Option<ComparisonResult>,
}
