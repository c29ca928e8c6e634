//! Device upload normalization
//!
//! This module turns a raw tabular upload plus a device identifier into the
//! canonical glucose series:
//! - value and timestamp columns extracted per device profile
//! - mmol/L uploads converted to mg/dL (one global decision per upload)
//! - duplicate timestamps reduced to the first occurrence
//! - rows sorted ascending with derived fields computed once

use chrono::{DateTime, NaiveDateTime};
use log::{debug, warn};

use crate::error::CgmError;
use crate::types::{Device, GlucoseSeries, Reading, TimestampFormat};

/// Uploads whose mean value falls below this are assumed to be mmol/L.
const MMOL_DETECTION_THRESHOLD: f64 = 40.0;

/// mg/dL per mmol/L
const MMOL_TO_MGDL: f64 = 18.0;

/// Layouts tried in order for auto-detected timestamp columns
const AUTO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Normalizer for converting device uploads to the canonical series
pub struct Normalizer;

impl Normalizer {
    /// Parse a raw upload for the given device into a canonical series.
    ///
    /// Fails with [`CgmError::Format`] when the declared columns are absent,
    /// when a non-empty timestamp does not match the device's declared
    /// format, or when no row yields a usable reading.
    pub fn normalize(raw: &str, device: Device) -> Result<GlucoseSeries, CgmError> {
        let profile = device.profile();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(profile.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let mut rows: Vec<(NaiveDateTime, f64)> = Vec::new();
        let mut dropped = 0usize;

        for (row_no, record) in reader.records().enumerate() {
            let record = record.map_err(|e| CgmError::Format {
                device: device.as_str(),
                reason: format!("row {row_no}: {e}"),
            })?;
            if row_no < profile.header_rows {
                continue;
            }

            let width = record.len();
            if width == 0 || (width == 1 && record.get(0).unwrap_or("").trim().is_empty()) {
                continue;
            }

            let value_idx = profile.value_column.resolve(width).ok_or_else(|| {
                CgmError::Format {
                    device: device.as_str(),
                    reason: format!(
                        "row {row_no} has {width} columns, value column {:?} is absent",
                        profile.value_column
                    ),
                }
            })?;
            let ts_idx = profile.timestamp_column.resolve(width).ok_or_else(|| {
                CgmError::Format {
                    device: device.as_str(),
                    reason: format!(
                        "row {row_no} has {width} columns, timestamp column {:?} is absent",
                        profile.timestamp_column
                    ),
                }
            })?;

            let ts_cell = record.get(ts_idx).unwrap_or("").trim();
            if ts_cell.is_empty() {
                dropped += 1;
                continue;
            }
            let timestamp = parse_timestamp(ts_cell, profile.timestamp_format).ok_or_else(
                || CgmError::Format {
                    device: device.as_str(),
                    reason: format!("row {row_no}: timestamp '{ts_cell}' does not match the expected format"),
                },
            )?;

            let value_cell = record.get(value_idx).unwrap_or("").trim();
            let value = match value_cell.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    if !value_cell.is_empty() {
                        warn!("dropping row {row_no}: non-numeric value '{value_cell}'");
                    }
                    dropped += 1;
                    continue;
                }
            };
            if !value.is_finite() || value <= 0.0 {
                dropped += 1;
                continue;
            }

            rows.push((timestamp, value));
        }

        if rows.is_empty() {
            return Err(CgmError::Format {
                device: device.as_str(),
                reason: "no parsable readings found in upload".to_string(),
            });
        }
        if dropped > 0 {
            debug!("dropped {dropped} rows without a usable value or timestamp");
        }

        // Unit reconciliation: one global decision per upload.
        let mean = rows.iter().map(|(_, v)| v).sum::<f64>() / rows.len() as f64;
        if mean < MMOL_DETECTION_THRESHOLD {
            debug!("mean value {mean:.1} below {MMOL_DETECTION_THRESHOLD}, converting mmol/L to mg/dL");
            for (_, v) in rows.iter_mut() {
                *v *= MMOL_TO_MGDL;
            }
        }

        // Duplicate timestamps keep the first occurrence in file order.
        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        rows.retain(|(ts, _)| seen.insert(*ts));

        rows.sort_by_key(|(ts, _)| *ts);

        let readings = rows
            .into_iter()
            .map(|(ts, v)| Reading::new(ts, v))
            .collect();
        Ok(GlucoseSeries::from_readings(readings))
    }
}

fn parse_timestamp(cell: &str, format: TimestampFormat) -> Option<NaiveDateTime> {
    match format {
        TimestampFormat::Declared(fmt) => NaiveDateTime::parse_from_str(cell, fmt).ok(),
        TimestampFormat::Auto => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
                return Some(dt.naive_local());
            }
            AUTO_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn libre_upload() -> String {
        let mut out = String::from("meta,meta,meta,meta,meta\n");
        out.push_str("dev,serial,01-15-2024 08:00 AM,0,100\n");
        out.push_str("dev,serial,01-15-2024 08:15 AM,0,110\n");
        out.push_str("dev,serial,01-15-2024 08:30 AM,0,120\n");
        out
    }

    #[test]
    fn test_libre_normalization() {
        let series = Normalizer::normalize(&libre_upload(), Device::Libre).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.readings[0].value, 100.0);
        assert_eq!(
            series.readings[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_dexcom_normalization() {
        let upload = "header\n\
                      a,2024-01-15T08:00:00,c,d,e,f,g,100\n\
                      a,2024-01-15T08:05:00,c,d,e,f,g,105\n";
        let series = Normalizer::normalize(upload, Device::Dexcom).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.readings[1].value, 105.0);
    }

    #[test]
    fn test_nightscout_normalization() {
        // value is the second-to-last field, timestamp is field 3
        let upload = "header\n\
                      a;b;c;2024-01-15 08:00:00;x;100;tail\n\
                      a;b;c;2024-01-15 08:05:00;x;105;tail\n";
        let series = Normalizer::normalize(upload, Device::Nightscout).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.readings[0].value, 100.0);
        assert_eq!(series.readings[0].timestamp.hour(), 8);
    }

    #[test]
    fn test_profiles_agree_on_identical_records() {
        let libre = "meta\n\
                     d,s,01-15-2024 08:00 AM,0,100\n\
                     d,s,01-15-2024 08:15 AM,0,110\n";
        let dexcom = "meta\n\
                      a,2024-01-15T08:00:00,c,d,e,f,g,100\n\
                      a,2024-01-15T08:15:00,c,d,e,f,g,110\n";
        let nightscout = "meta\n\
                          a;b;c;2024-01-15 08:00:00;100;tail\n\
                          a;b;c;2024-01-15 08:15:00;110;tail\n";

        let a = Normalizer::normalize(libre, Device::Libre).unwrap();
        let b = Normalizer::normalize(dexcom, Device::Dexcom).unwrap();
        let c = Normalizer::normalize(nightscout, Device::Nightscout).unwrap();

        let pairs =
            |s: &GlucoseSeries| s.readings.iter().map(|r| (r.timestamp, r.value)).collect::<Vec<_>>();
        assert_eq!(pairs(&a), pairs(&b));
        assert_eq!(pairs(&b), pairs(&c));
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let upload = "header\n\
                      a,2024-01-15T09:00:00,c,d,e,f,g,120\n\
                      a,2024-01-15T08:00:00,c,d,e,f,g,100\n\
                      a,2024-01-15T09:00:00,c,d,e,f,g,999\n";
        let series = Normalizer::normalize(upload, Device::Dexcom).unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.readings[0].timestamp < series.readings[1].timestamp);
        // keep-first: the 09:00 duplicate retains the earlier file row's value
        assert_eq!(series.readings[1].value, 120.0);
    }

    #[test]
    fn test_mmol_conversion_is_global() {
        let upload = "header\n\
                      a,2024-01-15T08:00:00,c,d,e,f,g,5.5\n\
                      a,2024-01-15T08:05:00,c,d,e,f,g,6.0\n";
        let series = Normalizer::normalize(upload, Device::Dexcom).unwrap();

        assert_eq!(series.readings[0].value, 99.0);
        assert_eq!(series.readings[1].value, 108.0);
    }

    #[test]
    fn test_rows_without_value_are_dropped() {
        let upload = "header\n\
                      a,2024-01-15T08:00:00,c,d,e,f,g,100\n\
                      a,2024-01-15T08:05:00,c,d,e,f,g,\n\
                      a,2024-01-15T08:10:00,c,d,e,f,g,n/a\n\
                      a,2024-01-15T08:15:00,c,d,e,f,g,110\n";
        let series = Normalizer::normalize(upload, Device::Dexcom).unwrap();

        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_bad_libre_timestamp_is_fatal() {
        let upload = "meta\n\
                      d,s,2024-01-15T08:00:00,0,100\n";
        let err = Normalizer::normalize(upload, Device::Libre).unwrap_err();

        match err {
            CgmError::Format { device, .. } => assert_eq!(device, "LibreLink"),
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_columns_are_fatal() {
        let upload = "meta\n\
                      a,2024-01-15T08:00:00,c\n";
        assert!(matches!(
            Normalizer::normalize(upload, Device::Dexcom),
            Err(CgmError::Format { .. })
        ));
    }

    #[test]
    fn test_empty_upload_is_fatal() {
        assert!(matches!(
            Normalizer::normalize("header\n", Device::Dexcom),
            Err(CgmError::Format { .. })
        ));
    }
}
