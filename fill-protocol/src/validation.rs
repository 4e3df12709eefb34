use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How strongly an issue should discourage a retry-free write. Severity
/// never gates the write by itself — only `ValidationResult::valid` does,
/// and only hard format failures set `valid = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ValidationSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// A short machine-matchable kind, e.g. `"not_a_url"`, `"too_short"`,
    /// `"low_relevance"`, `"operator_mismatch"`.
    pub issue_type: String,
    pub message: String,
    pub severity: ValidationSeverity,
}

/// The validator's verdict. Lenient by design: `valid` is `false` only on
/// hard format failures (non-numeric text in a number column, an empty
/// required field); everything else lowers `confidence` but leaves
/// `valid = true`. Below `validator.low_confidence_threshold`, the
/// dispatcher schedules one in-process retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub confidence: f64,
    pub issues: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
    pub sanitized: Option<String>,
}

impl ValidationResult {
    pub fn has_hard_error(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }
}
