//! Time-window filtering
//!
//! Restricts a canonical series to a requested range / weekday / time-of-day
//! window and derives the immediately preceding baseline window of equal
//! length. Every filter call produces a new, independent series.

use chrono::{Duration, NaiveDateTime, NaiveTime, Weekday};

use crate::error::CgmError;
use crate::types::{GlucoseSeries, Reading};

/// How far back from the last reading the analysis window reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelector {
    All,
    TwoWeeks,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl RangeSelector {
    /// Window length in days; `None` for the unrestricted range.
    pub fn days(&self) -> Option<i64> {
        match self {
            RangeSelector::All => None,
            RangeSelector::TwoWeeks => Some(14),
            RangeSelector::OneMonth => Some(30),
            RangeSelector::ThreeMonths => Some(90),
            RangeSelector::SixMonths => Some(180),
            RangeSelector::OneYear => Some(365),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeSelector::All => "all",
            RangeSelector::TwoWeeks => "2w",
            RangeSelector::OneMonth => "1m",
            RangeSelector::ThreeMonths => "3m",
            RangeSelector::SixMonths => "6m",
            RangeSelector::OneYear => "1y",
        }
    }
}

impl std::str::FromStr for RangeSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RangeSelector::All),
            "2w" => Ok(RangeSelector::TwoWeeks),
            "1m" => Ok(RangeSelector::OneMonth),
            "3m" => Ok(RangeSelector::ThreeMonths),
            "6m" => Ok(RangeSelector::SixMonths),
            "1y" => Ok(RangeSelector::OneYear),
            other => Err(format!("unknown range selector '{other}'")),
        }
    }
}

/// Immutable filter configuration, constructed once per request.
///
/// The time-of-day window is inclusive on both ends. A window whose start is
/// after its end is rejected at construction; overnight windows are not
/// supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    range: RangeSelector,
    weekday: Option<Weekday>,
    time_of_day: Option<(NaiveTime, NaiveTime)>,
}

impl FilterSpec {
    pub fn new(
        range: RangeSelector,
        weekday: Option<Weekday>,
        time_of_day: Option<(NaiveTime, NaiveTime)>,
    ) -> Result<Self, CgmError> {
        if let Some((start, end)) = time_of_day {
            if start > end {
                return Err(CgmError::InvalidTimeWindow { start, end });
            }
        }
        Ok(Self {
            range,
            weekday,
            time_of_day,
        })
    }

    /// Spec matching every reading: all times, every day, whole day.
    pub fn unrestricted() -> Self {
        Self {
            range: RangeSelector::All,
            weekday: None,
            time_of_day: None,
        }
    }

    pub fn range(&self) -> RangeSelector {
        self.range
    }

    pub fn weekday(&self) -> Option<Weekday> {
        self.weekday
    }

    pub fn time_of_day(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.time_of_day
    }

    fn matches_day_and_time(&self, reading: &Reading) -> bool {
        if let Some(day) = self.weekday {
            if reading.weekday != day {
                return false;
            }
        }
        if let Some((start, end)) = self.time_of_day {
            let t = reading.timestamp.time();
            if t < start || t > end {
                return false;
            }
        }
        true
    }
}

/// Restrict a canonical series to the requested primary window.
///
/// For a finite range of N days the window is `(last - N days, last]`, where
/// `last` is the final reading's timestamp. Yields [`CgmError::EmptyResult`]
/// when nothing survives the filters.
pub fn filter_primary(
    series: &GlucoseSeries,
    spec: &FilterSpec,
) -> Result<GlucoseSeries, CgmError> {
    let last = series.last_timestamp().ok_or(CgmError::EmptyResult)?;
    let window = spec
        .range
        .days()
        .map(|days| (last - Duration::days(days), last));

    let filtered = apply(series, spec, window);
    if filtered.is_empty() {
        return Err(CgmError::EmptyResult);
    }
    Ok(filtered)
}

/// Derive the baseline window: the immediately preceding, non-overlapping
/// interval of equal length, `(last - 2N days, last - N days]`.
///
/// Returns `None` for the unrestricted range and for a baseline window that
/// ends up empty -- an absent baseline is a degraded-comparison state, never
/// an error.
pub fn filter_baseline(series: &GlucoseSeries, spec: &FilterSpec) -> Option<GlucoseSeries> {
    let last = series.last_timestamp()?;
    let days = spec.range.days()?;
    let window = (
        last - Duration::days(2 * days),
        last - Duration::days(days),
    );

    let filtered = apply(series, spec, Some(window));
    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

fn apply(
    series: &GlucoseSeries,
    spec: &FilterSpec,
    window: Option<(NaiveDateTime, NaiveDateTime)>,
) -> GlucoseSeries {
    series.retain_readings(|r| {
        if let Some((after, upto)) = window {
            if r.timestamp <= after || r.timestamp > upto {
                return false;
            }
        }
        spec.matches_day_and_time(r)
    })
}
