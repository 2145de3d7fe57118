//! Report repository — normalizes loosely-typed collaborator payloads
//! into the canonical `Report` model and serves history/lookup with a
//! session-local cache.
//!
//! Normalization is permissive by contract: absent fields default, the
//! reference range is reconciled from its three alternate keys, and every
//! status/risk string is classified once into a cached `Severity`. A
//! malformed field never fails the whole report.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::api::{AnalysisApi, TransportError};
use crate::models::{Report, RiskSummary, TestResult, TestValue, UrgencyLevel};
use crate::severity;
use crate::severity::reference::{self, Sex};

/// Alternate keys the external payload may use for the reference range,
/// in lookup order. The first present, non-empty one wins.
const RANGE_KEYS: [&str; 3] = ["ref_range", "referenceRange", "range"];

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Normalize one raw analysis payload into a `Report`. Total — any field
/// the payload lacks or mangles gets its default.
pub fn normalize(raw: &Value) -> Report {
    // History entries may nest the analysis under an `analysis` key.
    let raw = match raw.get("analysis") {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    };

    let id = string_field(raw, &["id", "reportId"])
        .and_then(|s| Uuid::parse_str(&s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let created_at = string_field(raw, &["createdAt"])
        .and_then(|s| parse_timestamp(&s))
        .unwrap_or_else(Utc::now);

    let mut tests: Vec<TestResult> = raw
        .get("tests")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(normalize_test).collect())
        .unwrap_or_default();

    // Ground every extracted value against the reference table; this also
    // fills in statuses the upstream engine left blank and caches each
    // row's severity.
    let assessment = reference::assess(&mut tests, Sex::default());

    let risk_summary = normalize_risk(raw, &assessment.summary);

    let recommended_specialist = string_field(raw, &["recommendedSpecialist", "specialist"])
        .or(Some(assessment.recommended_specialist));

    let report = Report {
        id,
        created_at,
        source_filename: string_field(raw, &["filename"]),
        report_type: string_field(raw, &["reportType", "report_type"])
            .unwrap_or_else(|| "Medical Report".into()),
        tests,
        risk_summary,
        summary: string_field(raw, &["summary"]).unwrap_or_default(),
        lifestyle: raw
            .get("lifestyle")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        recommended_specialist,
        urgency: string_field(raw, &["urgency"])
            .and_then(|s| s.parse().ok())
            .unwrap_or(UrgencyLevel::Routine),
        disclaimer: string_field(raw, &["disclaimer"]),
    };

    tracing::debug!(
        report_id = %report.id,
        tests = report.tests.len(),
        risk = %report.risk_summary.overall_risk,
        "Payload normalized"
    );
    report
}

fn normalize_test(raw: &Value) -> TestResult {
    let value = match raw.get("value").or_else(|| raw.get("result")) {
        Some(Value::Number(n)) => TestValue::Number(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(s)) => TestValue::Text(s.clone()),
        _ => TestValue::default(),
    };

    let reference_range = RANGE_KEYS.iter().find_map(|key| {
        raw.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    });

    let status = string_field(raw, &["status"]).unwrap_or_default();

    TestResult {
        name: string_field(raw, &["name", "test_name"]).unwrap_or_else(|| "Unknown".into()),
        value,
        unit: string_field(raw, &["unit"]),
        reference_range,
        severity: severity::classify(&status),
        status,
    }
}

/// Risk summary precedence: an explicit `riskSummary` object wins, then a
/// top-level `overall_risk` from the analysis engine, then the computed
/// assessment.
fn normalize_risk(raw: &Value, computed: &RiskSummary) -> RiskSummary {
    if let Some(given) = raw.get("riskSummary").filter(|v| v.is_object()) {
        let overall_risk =
            string_field(given, &["overallRisk"]).unwrap_or_else(|| computed.overall_risk.clone());
        return RiskSummary {
            severity: severity::classify(&overall_risk),
            banner_message: string_field(given, &["bannerMessage"])
                .or_else(|| computed.banner_message.clone()),
            banner_color: string_field(given, &["severityBannerColor"])
                .and_then(|s| s.parse().ok())
                .or(computed.banner_color.clone()),
            abnormal_count: given
                .get("abnormalCount")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(computed.abnormal_count),
            overall_risk,
        };
    }

    if let Some(ai_risk) = string_field(raw, &["overall_risk"]) {
        let (color, message) = if ai_risk.contains("High") {
            ("red", "CRITICAL FINDINGS DETECTED")
        } else if ai_risk.contains("Moderate") {
            ("yellow", "MODERATE DEVIATIONS DETECTED")
        } else {
            ("green", "OPTIMAL HEALTH PROFILE")
        };
        return RiskSummary {
            severity: severity::classify(&ai_risk),
            banner_message: Some(message.into()),
            banner_color: color.parse().ok(),
            abnormal_count: computed.abnormal_count,
            overall_risk: ai_risk,
        };
    }

    computed.clone()
}

fn string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        raw.get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

/// The collaborator emits naive local timestamps; treat those as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}

/// Session-scoped access to reports: remote fetch through the API seam
/// plus an id-keyed cache of normalized copies.
pub struct ReportRepository<A: AnalysisApi> {
    api: Arc<A>,
    cache: Mutex<HashMap<Uuid, Report>>,
}

impl<A: AnalysisApi> ReportRepository<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Cache a freshly produced report (e.g. from a completed workflow).
    pub fn insert(&self, report: Report) {
        self.lock().insert(report.id, report);
    }

    pub fn cached(&self, id: Uuid) -> Option<Report> {
        self.lock().get(&id).cloned()
    }

    /// Fetch one report, from cache when possible.
    pub async fn get(&self, id: Uuid) -> Result<Report, RepositoryError> {
        if let Some(report) = self.cached(id) {
            return Ok(report);
        }

        match self.api.fetch_report(id).await {
            Ok(Value::Null) => Err(RepositoryError::NotFound(id)),
            Ok(raw) => {
                let report = normalize(&raw);
                self.insert(report.clone());
                Ok(report)
            }
            Err(TransportError::Status { status: 404, .. }) => Err(RepositoryError::NotFound(id)),
            Err(error) => Err(error.into()),
        }
    }

    /// All reports, most recent first.
    pub async fn history(&self) -> Result<Vec<Report>, RepositoryError> {
        let entries = self.api.fetch_history().await?;
        let mut reports: Vec<Report> = entries.iter().map(normalize).collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for report in &reports {
            self.insert(report.clone());
        }
        Ok(reports)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Report>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
