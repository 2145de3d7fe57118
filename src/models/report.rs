use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BannerColor, Severity, UrgencyLevel};

/// A lab test value as extracted upstream — numeric when the analysis
/// engine could parse one, free text otherwise ("Positive", "Trace", …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestValue {
    Number(f64),
    Text(String),
}

impl TestValue {
    /// Raw string form, as shown to the user and fed to value parsing.
    pub fn display(&self) -> String {
        match self {
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Text(s) => s.clone(),
        }
    }
}

impl Default for TestValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// One normalized test row of a report.
///
/// `reference_range` is reconciled from the three alternate keys the
/// external analysis payload may use (`ref_range`, `referenceRange`,
/// `range`). `severity` is derived once at normalization time and cached
/// here, never recomputed per render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub name: String,
    pub value: TestValue,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
    /// Raw status string from upstream ("Normal", "High", "Borderline", …).
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Overall risk assessment for one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    /// Raw overall risk string from upstream ("Low", "Moderate", "High").
    pub overall_risk: String,
    #[serde(default)]
    pub banner_message: Option<String>,
    /// Presentation hint only — business logic reads `severity`.
    #[serde(default, rename = "severityBannerColor")]
    pub banner_color: Option<BannerColor>,
    #[serde(default)]
    pub abnormal_count: usize,
    #[serde(default)]
    pub severity: Severity,
}

impl Default for RiskSummary {
    fn default() -> Self {
        Self {
            overall_risk: "Low".into(),
            banner_message: None,
            banner_color: Some(BannerColor::Green),
            abnormal_count: 0,
            severity: Severity::Normal,
        }
    }
}

/// Canonical normalized representation of one analyzed lab report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source_filename: Option<String>,
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default)]
    pub tests: Vec<TestResult>,
    #[serde(default)]
    pub risk_summary: RiskSummary,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub lifestyle: Vec<String>,
    #[serde(default)]
    pub recommended_specialist: Option<String>,
    #[serde(default = "default_urgency")]
    pub urgency: UrgencyLevel,
    #[serde(default)]
    pub disclaimer: Option<String>,
}

fn default_report_type() -> String {
    "Medical Report".into()
}

fn default_urgency() -> UrgencyLevel {
    UrgencyLevel::Routine
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(TestValue::Number(250.0).display(), "250");
        assert_eq!(TestValue::Number(7.2).display(), "7.2");
        assert_eq!(TestValue::Text("Positive".into()).display(), "Positive");
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let n: TestValue = serde_json::from_str("9.6").unwrap();
        assert_eq!(n, TestValue::Number(9.6));
        let t: TestValue = serde_json::from_str("\"2.48 lakhs\"").unwrap();
        assert_eq!(t, TestValue::Text("2.48 lakhs".into()));
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = Report {
            id: Uuid::nil(),
            created_at: Utc::now(),
            source_filename: Some("cbc.pdf".into()),
            report_type: "Complete Blood Count".into(),
            tests: vec![],
            risk_summary: RiskSummary::default(),
            summary: "All values within normal limits.".into(),
            lifestyle: vec![],
            recommended_specialist: None,
            urgency: UrgencyLevel::Routine,
            disclaimer: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("sourceFilename"));
        assert!(json.contains("riskSummary"));
        assert!(json.contains("reportType"));
    }

    #[test]
    fn risk_summary_banner_color_wire_name() {
        let summary = RiskSummary {
            overall_risk: "High".into(),
            banner_message: Some("CRITICAL MARKERS DETECTED".into()),
            banner_color: Some(BannerColor::Red),
            abnormal_count: 2,
            severity: Severity::Alert,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("severityBannerColor"));
        assert!(json.contains("overallRisk"));
    }
}
