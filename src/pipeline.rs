//! Pipeline orchestration
//!
//! This module provides the public API for EndoMetrics. One request -- a raw
//! upload, a device identifier, and a filter spec -- flows through
//! normalization, window filtering, the metrics engine, and the period
//! comparator, producing a single immutable report. The pipeline holds no
//! state of its own; concurrent invocation for independent uploads is safe
//! by construction.

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::compare::compare;
use crate::error::CgmError;
use crate::filter::{filter_baseline, filter_primary, FilterSpec};
use crate::metrics::MetricsEngine;
use crate::normalizer::Normalizer;
use crate::types::{AnalysisReport, Device, Provenance};
use crate::{CRATE_VERSION, PRODUCER_NAME};

/// One analysis request: immutable, constructed once, threaded through the
/// whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisRequest {
    pub device: Device,
    pub filter: FilterSpec,
    /// When set and the range is finite, the preceding window of equal
    /// length is analyzed and compared against the primary window.
    pub include_baseline: bool,
}

impl AnalysisRequest {
    pub fn new(device: Device, filter: FilterSpec) -> Self {
        Self {
            device,
            filter,
            include_baseline: true,
        }
    }

    pub fn without_baseline(device: Device, filter: FilterSpec) -> Self {
        Self {
            device,
            filter,
            include_baseline: false,
        }
    }
}

/// Run the full pipeline for one upload.
///
/// Pipeline stages:
/// 1. Normalizer - device columns to canonical series
/// 2. Filter - primary window (and baseline window, when requested)
/// 3. MetricsEngine - indicator battery per window
/// 4. Comparator - per-indicator deltas when a baseline exists
pub fn analyze_upload(raw: &str, request: &AnalysisRequest) -> Result<AnalysisReport, CgmError> {
    let canonical = Normalizer::normalize(raw, request.device)?;
    debug!(
        "normalized {} readings from {} upload",
        canonical.len(),
        request.device.as_str()
    );

    let primary_series = filter_primary(&canonical, &request.filter)?;
    let primary = MetricsEngine::compute(&primary_series)?;

    let (baseline, comparison) = if request.include_baseline {
        match filter_baseline(&canonical, &request.filter) {
            Some(baseline_series) => {
                let baseline_metrics = MetricsEngine::compute(&baseline_series)?;
                let deltas = compare(&primary, &baseline_metrics);
                (Some(baseline_metrics), Some(deltas))
            }
            None => {
                debug!("no baseline window available; reporting primary only");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    Ok(AnalysisReport {
        provenance: Provenance {
            producer: PRODUCER_NAME.to_string(),
            version: CRATE_VERSION.to_string(),
            request_id: Uuid::new_v4(),
            computed_at: Utc::now(),
        },
        device: request.device,
        primary,
        baseline,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RangeSelector;
    use pretty_assertions::assert_eq;

    /// Dexcom-style upload: four readings per day over `days` days ending
    /// 2024-03-01, glucose cycling through a small swing.
    fn dexcom_upload(days: u32) -> String {
        let mut out = String::from("header\n");
        for d in 0..days {
            let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .checked_sub_days(chrono::Days::new(u64::from(days - 1 - d)))
                .unwrap();
            for (i, hour) in [6u32, 10, 14, 18].iter().enumerate() {
                let value = 95 + 10 * ((d as usize + i) % 4);
                out.push_str(&format!(
                    "a,{date}T{hour:02}:00:00,c,d,e,f,g,{value}\n"
                ));
            }
        }
        out
    }

    #[test]
    fn test_full_pipeline_with_baseline() {
        let upload = dexcom_upload(40);
        let spec = FilterSpec::new(RangeSelector::TwoWeeks, None, None).unwrap();
        let request = AnalysisRequest::new(Device::Dexcom, spec);

        let report = analyze_upload(&upload, &request).unwrap();

        assert_eq!(report.device, Device::Dexcom);
        assert!(report.baseline.is_some());
        assert!(report.comparison.is_some());

        let baseline = report.baseline.as_ref().unwrap();
        let comparison = report.comparison.as_ref().unwrap();
        assert_eq!(
            comparison.mean_glucose,
            report.primary.mean_glucose - baseline.mean_glucose
        );
        assert_eq!(report.provenance.producer, PRODUCER_NAME);
    }

    #[test]
    fn test_all_times_reports_primary_only() {
        let upload = dexcom_upload(40);
        let request = AnalysisRequest::new(Device::Dexcom, FilterSpec::unrestricted());

        let report = analyze_upload(&upload, &request).unwrap();

        assert_eq!(report.primary.count, 160);
        assert_eq!(report.baseline, None);
        assert_eq!(report.comparison, None);
    }

    #[test]
    fn test_baseline_can_be_declined() {
        let upload = dexcom_upload(40);
        let spec = FilterSpec::new(RangeSelector::TwoWeeks, None, None).unwrap();
        let request = AnalysisRequest::without_baseline(Device::Dexcom, spec);

        let report = analyze_upload(&upload, &request).unwrap();

        assert!(report.baseline.is_none());
        assert!(report.comparison.is_none());
    }

    #[test]
    fn test_short_history_degrades_gracefully() {
        // 10 days of data with a 14-day range: primary is fine, baseline
        // window is empty, comparison is skipped
        let upload = dexcom_upload(10);
        let spec = FilterSpec::new(RangeSelector::TwoWeeks, None, None).unwrap();
        let request = AnalysisRequest::new(Device::Dexcom, spec);

        let report = analyze_upload(&upload, &request).unwrap();

        assert!(report.baseline.is_none());
        assert!(report.comparison.is_none());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let upload = dexcom_upload(20);
        let spec = FilterSpec::new(RangeSelector::TwoWeeks, None, None).unwrap();
        let request = AnalysisRequest::new(Device::Dexcom, spec);

        let report = analyze_upload(&upload, &request).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["device"], "dexcom");
        assert!(value["primary"]["mean_glucose"].is_number());
        assert!(value["provenance"]["request_id"].is_string());
    }

    #[test]
    fn test_format_error_propagates() {
        let request = AnalysisRequest::new(Device::Libre, FilterSpec::unrestricted());
        let err = analyze_upload(&dexcom_upload(5), &request).unwrap_err();

        assert!(matches!(err, CgmError::Format { device: "LibreLink", .. }));
    }
}
