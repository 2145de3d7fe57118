//! Reference-range grounding engine for AI-extracted lab values.
//!
//! The external analysis engine extracts free-form test rows; this module
//! compares each value against a master reference table (per-sex ranges),
//! grades it Low/High/Borderline/Normal, and aggregates the graded rows
//! into an overall risk summary with a specialist recommendation.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{BannerColor, RiskSummary, TestResult};

use super::classify;

/// Biological sex used to select a reference range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sex {
    #[default]
    Male,
    Female,
}

/// One row of the master reference table.
#[derive(Debug)]
pub struct ReferenceEntry {
    /// Lowercase key matched as a substring of the incoming test name.
    pub key: &'static str,
    pub male: (f64, f64),
    pub female: (f64, f64),
    pub unit: &'static str,
    pub category: &'static str,
    pub specialist: &'static str,
}

impl ReferenceEntry {
    pub fn range(&self, sex: Sex) -> (f64, f64) {
        match sex {
            Sex::Male => self.male,
            Sex::Female => self.female,
        }
    }
}

/// Master reference table for common report types.
///
/// Entry order matters: lookup takes the first key contained in the test
/// name, so specific keys ("fasting glucose") precede generic ones
/// ("glucose").
static MASTER_REFERENCE: &[ReferenceEntry] = &[
    // Hematology
    ReferenceEntry { key: "wbc", male: (4.0, 11.0), female: (4.0, 11.0), unit: "x10^9/L", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "rbc", male: (4.5, 5.9), female: (4.1, 5.1), unit: "x10^12/L", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "hemoglobin", male: (13.2, 16.6), female: (11.6, 15.0), unit: "g/dL", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "haemoglobin", male: (13.2, 16.6), female: (11.6, 15.0), unit: "g/dL", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "hematocrit", male: (38.3, 48.6), female: (35.5, 44.9), unit: "%", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "pcv", male: (38.3, 48.6), female: (35.5, 44.9), unit: "%", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "platelet", male: (150.0, 450.0), female: (150.0, 450.0), unit: "x10^9/L", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "esr", male: (0.0, 22.0), female: (0.0, 29.0), unit: "mm/hr", category: "Hematology", specialist: "Rheumatologist" },
    ReferenceEntry { key: "mcv", male: (80.0, 100.0), female: (80.0, 100.0), unit: "fL", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "mchc", male: (32.0, 36.0), female: (32.0, 36.0), unit: "g/dL", category: "Hematology", specialist: "Hematologist" },
    ReferenceEntry { key: "mch", male: (27.0, 33.0), female: (27.0, 33.0), unit: "pg", category: "Hematology", specialist: "Hematologist" },
    // Biochemistry & diabetes
    ReferenceEntry { key: "fasting glucose", male: (70.0, 99.0), female: (70.0, 99.0), unit: "mg/dL", category: "Biochemistry", specialist: "Endocrinologist" },
    ReferenceEntry { key: "random glucose", male: (80.0, 140.0), female: (80.0, 140.0), unit: "mg/dL", category: "Biochemistry", specialist: "Endocrinologist" },
    ReferenceEntry { key: "glucose", male: (70.0, 140.0), female: (70.0, 140.0), unit: "mg/dL", category: "Biochemistry", specialist: "Endocrinologist" },
    ReferenceEntry { key: "hba1c", male: (4.0, 5.6), female: (4.0, 5.6), unit: "%", category: "Biochemistry", specialist: "Endocrinologist" },
    ReferenceEntry { key: "creatinine", male: (0.7, 1.3), female: (0.6, 1.1), unit: "mg/dL", category: "Biochemistry", specialist: "Nephrologist" },
    ReferenceEntry { key: "urea", male: (15.0, 50.0), female: (15.0, 50.0), unit: "mg/dL", category: "Biochemistry", specialist: "Nephrologist" },
    ReferenceEntry { key: "bun", male: (7.0, 20.0), female: (7.0, 20.0), unit: "mg/dL", category: "Biochemistry", specialist: "Nephrologist" },
    ReferenceEntry { key: "uric acid", male: (3.4, 7.0), female: (2.4, 6.0), unit: "mg/dL", category: "Biochemistry", specialist: "Rheumatologist" },
    ReferenceEntry { key: "total protein", male: (6.0, 8.3), female: (6.0, 8.3), unit: "g/dL", category: "Biochemistry", specialist: "Internal Medicine" },
    // Liver function
    ReferenceEntry { key: "ast", male: (8.0, 48.0), female: (8.0, 48.0), unit: "U/L", category: "LFT", specialist: "Hepatologist" },
    ReferenceEntry { key: "alt", male: (7.0, 56.0), female: (7.0, 56.0), unit: "U/L", category: "LFT", specialist: "Hepatologist" },
    ReferenceEntry { key: "alp", male: (40.0, 129.0), female: (40.0, 129.0), unit: "U/L", category: "LFT", specialist: "Gastroenterologist" },
    ReferenceEntry { key: "ggt", male: (9.0, 48.0), female: (9.0, 48.0), unit: "U/L", category: "LFT", specialist: "Hepatologist" },
    ReferenceEntry { key: "total bilirubin", male: (0.3, 1.9), female: (0.3, 1.9), unit: "mg/dL", category: "LFT", specialist: "Hepatologist" },
    ReferenceEntry { key: "direct bilirubin", male: (0.0, 0.3), female: (0.0, 0.3), unit: "mg/dL", category: "LFT", specialist: "Hepatologist" },
    ReferenceEntry { key: "albumin", male: (3.5, 5.5), female: (3.5, 5.5), unit: "g/dL", category: "LFT", specialist: "Hepatologist" },
    ReferenceEntry { key: "ldh", male: (140.0, 280.0), female: (140.0, 280.0), unit: "U/L", category: "LFT", specialist: "Hepatologist" },
    // Oncology markers
    ReferenceEntry { key: "psa", male: (0.0, 4.0), female: (0.0, 0.0), unit: "ng/mL", category: "Oncology", specialist: "Urologist" },
    ReferenceEntry { key: "ca-125", male: (0.0, 35.0), female: (0.0, 35.0), unit: "U/mL", category: "Oncology", specialist: "Gynecologist" },
    ReferenceEntry { key: "cea", male: (0.0, 3.0), female: (0.0, 3.0), unit: "ng/mL", category: "Oncology", specialist: "Oncologist" },
    ReferenceEntry { key: "afp", male: (0.0, 8.0), female: (0.0, 8.0), unit: "ng/mL", category: "Oncology", specialist: "Hepatologist" },
    // Infectious disease
    ReferenceEntry { key: "hiv viral load", male: (0.0, 20.0), female: (0.0, 20.0), unit: "copies/mL", category: "Infectious Disease", specialist: "HIV/AIDS Care Specialist" },
    ReferenceEntry { key: "tb quantiferon", male: (0.0, 0.35), female: (0.0, 0.35), unit: "IU/mL", category: "Infectious Disease", specialist: "Pulmonologist" },
    // Fertility & hormones
    ReferenceEntry { key: "fsh", male: (1.5, 12.4), female: (4.7, 21.5), unit: "mIU/mL", category: "Fertility", specialist: "Reproductive Endocrinologist" },
    ReferenceEntry { key: "estradiol", male: (10.0, 50.0), female: (30.0, 400.0), unit: "pg/mL", category: "Fertility", specialist: "Gynecologist" },
];

/// Test-name fragments that mark an abnormality as severe regardless of
/// the abnormal count.
const SEVERE_MARKERS: &[&str] = &["crp", "creatinine", "hiv", "hbsag", "troponin", "psa", "cea"];

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("Invalid number pattern"));

/// Grading outcome for a single value against its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// Test name not present in the master table.
    NotClassified,
    /// No numeric value could be extracted.
    InvalidData,
    Low,
    High,
    Borderline,
    Normal,
}

impl RangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotClassified => "Not Classified",
            Self::InvalidData => "Invalid Data",
            Self::Low => "Low",
            Self::High => "High",
            Self::Borderline => "Borderline",
            Self::Normal => "Normal",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Low | Self::High | Self::Borderline)
    }
}

/// Extract a numeric value from a noisy value string.
///
/// Strips thousands separators and handles the "lakh" notation common in
/// Indian reports (2.48 lakhs = 248,000).
pub fn clean_value(raw: &str) -> Option<f64> {
    let mut s = raw.to_lowercase().replace(',', "");
    let mut multiplier = 1.0;
    if s.contains("lakh") {
        multiplier = 100_000.0;
        s = s.replace("lakh", "").replace('s', "");
    }
    NUMBER_RE
        .find(&s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v * multiplier)
}

/// Find the reference entry for a test name, if any.
///
/// `(F)`/`(PP)` suffixes are expanded to their glucose-panel meanings
/// before matching.
pub fn lookup(test_name: &str) -> Option<&'static ReferenceEntry> {
    let key = test_name
        .to_lowercase()
        .replace("(f)", "fasting")
        .replace("(pp)", "random");
    MASTER_REFERENCE.iter().find(|e| key.contains(e.key))
}

/// Grade one value against the reference range for `test_name`.
///
/// Values more than 100x above the high bound are assumed to be in a
/// smaller unit scale (e.g. /µL against a x10^9/L range) and divided by
/// 1000. Borderline is within 10% of either range edge.
pub fn grade_value(test_name: &str, raw_value: &str, sex: Sex) -> RangeStatus {
    let Some(entry) = lookup(test_name) else {
        return RangeStatus::NotClassified;
    };
    let Some(value) = clean_value(raw_value) else {
        return RangeStatus::InvalidData;
    };

    let (low, high) = entry.range(sex);
    let normalized = if value > high * 100.0 { value / 1000.0 } else { value };

    if normalized < low {
        return RangeStatus::Low;
    }
    if normalized > high {
        return RangeStatus::High;
    }
    if normalized <= low * 1.1 || normalized >= high * 0.9 {
        return RangeStatus::Borderline;
    }
    RangeStatus::Normal
}

/// Result of assessing a full set of graded tests.
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub summary: RiskSummary,
    pub recommended_specialist: String,
}

/// Grade every test in place and derive the overall risk summary.
///
/// Tests the table cannot classify keep their upstream status (defaulting
/// to "Normal"); abnormality for those is judged from the raw status text.
/// Each final status is classified into a cached `Severity`.
pub fn assess(tests: &mut [TestResult], sex: Sex) -> RiskAssessment {
    let mut abnormal_count = 0usize;
    let mut severe_flags: Vec<String> = Vec::new();
    let mut specialists: Vec<&'static str> = Vec::new();

    for test in tests.iter_mut() {
        let graded = grade_value(&test.name, &test.value.display(), sex);
        let (status, is_abnormal) = match graded {
            RangeStatus::NotClassified => {
                let status = if test.status.is_empty() {
                    "Normal".to_string()
                } else {
                    test.status.clone()
                };
                let abnormal = !matches!(status.to_lowercase().as_str(), "normal" | "optimal");
                (status, abnormal)
            }
            other => (other.as_str().to_string(), other.is_abnormal()),
        };

        test.status = status;
        test.severity = classify(&test.status);

        if is_abnormal {
            abnormal_count += 1;
            if let Some(entry) = lookup(&test.name) {
                specialists.push(entry.specialist);
            }
            let name_lower = test.name.to_lowercase();
            if SEVERE_MARKERS.iter().any(|m| name_lower.contains(m)) {
                severe_flags.push(test.name.clone());
            }
        }
    }

    let abnormal_specialist = specialists.first().copied().unwrap_or("General Physician");

    let (overall, message, color, specialist) = if !severe_flags.is_empty() {
        ("High", "CRITICAL MARKERS DETECTED", BannerColor::Red, abnormal_specialist)
    } else if abnormal_count >= 3 {
        ("Moderate", "MULTIPLE ABNORMALITIES DETECTED", BannerColor::Yellow, abnormal_specialist)
    } else if abnormal_count > 0 {
        ("Moderate", "MINOR DEVIATIONS FOUND", BannerColor::Yellow, abnormal_specialist)
    } else {
        ("Low", "OPTIMAL HEALTH PROFILE", BannerColor::Green, "General Wellness")
    };

    tracing::debug!(
        abnormal = abnormal_count,
        severe = severe_flags.len(),
        overall,
        "Risk assessment complete"
    );

    RiskAssessment {
        summary: RiskSummary {
            overall_risk: overall.into(),
            banner_message: Some(message.into()),
            banner_color: Some(color),
            abnormal_count,
            severity: classify(overall),
        },
        recommended_specialist: specialist.into(),
    }
}
