//! Lenient, warning-oriented validation (spec.md §4.4). `valid` is
//! `false` only on hard format failures; everything else lowers
//! `confidence` but leaves `valid = true`. Pure functions: no I/O, no
//! database — unit-tested directly, following the style of the teacher's
//! `play/src/sanitize.rs` and `play/src/limits.rs`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use fill_protocol::{Column, DataType, OperatorName, ValidationIssue, ValidationResult, ValidationSeverity};

fn issue(issue_type: &str, message: impl Into<String>, severity: ValidationSeverity) -> ValidationIssue {
    ValidationIssue {
        issue_type: issue_type.to_owned(),
        message: message.into(),
        severity,
    }
}

fn warn(issue_type: &str, message: impl Into<String>) -> ValidationIssue {
    issue(issue_type, message, ValidationSeverity::Warning)
}

fn err(issue_type: &str, message: impl Into<String>) -> ValidationIssue {
    issue(issue_type, message, ValidationSeverity::Error)
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap());
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$€£¥₹]?\s*-?\d[\d,]*(\.\d+)?$").unwrap());
static DATE_ISO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static DATE_LONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+ \d{1,2},? \d{4}$").unwrap());
static DATE_SLASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap());
static PERSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z'.-]*(\s+[A-Z][a-zA-Z'.-]*)+$").unwrap());
static COMPANY_KEYWORDS: &[&str] = &[
    "inc", "inc.", "llc", "ltd", "corp", "corp.", "co.", "company", "group", "holdings", "gmbh",
];

/// Validate `content` against `column`'s format contract. Also computes a
/// relevance score (keyword overlap between column title and content
/// tokens) which lowers confidence, but never invalidates, below 0.3.
pub fn validate(content: &str, column: &Column) -> ValidationResult {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    let mut sanitized: Option<String> = None;
    let mut confidence: f64 = 1.0;

    if column.required && content.trim().is_empty() {
        issues.push(err("empty_required_field", "this field is required but content is empty"));
    }

    if let Some(max_length) = column.max_length
        && content.len() > max_length
    {
        issues.push(warn(
            "too_long",
            format!("content exceeds max length of {max_length} characters"),
        ));
        confidence -= 0.1;
    }
    if let Some(min_length) = column.min_length
        && content.len() < min_length
    {
        issues.push(warn(
            "too_short",
            format!("content is shorter than the minimum of {min_length} characters"),
        ));
        confidence -= 0.1;
    }

    let (type_valid, type_sanitized) = validate_type(content, column.data_type, &mut issues, &mut suggestions);
    sanitized = sanitized.or(type_sanitized);

    let relevance = relevance_score(&column.title, content);
    if relevance < 0.3 {
        issues.push(warn(
            "low_relevance",
            format!("content has low keyword overlap ({relevance:.2}) with column title '{}'", column.title),
        ));
        confidence -= 0.2;
    }

    let valid = type_valid && !issues.iter().any(|i| i.severity == ValidationSeverity::Error);
    confidence = confidence.clamp(0.0, 1.0);

    ValidationResult {
        valid,
        confidence,
        issues,
        suggestions,
        sanitized,
    }
}

/// Returns `(valid, sanitized)`. `valid = false` only on a hard format
/// failure for that data type.
fn validate_type(
    content: &str,
    data_type: DataType,
    issues: &mut Vec<ValidationIssue>,
    suggestions: &mut Vec<String>,
) -> (bool, Option<String>) {
    match data_type {
        DataType::ShortText => {
            if content.len() > 100 {
                issues.push(warn("too_long_for_short_text", "short_text is recommended to stay under 100 characters"));
                let mut truncated: String = content.chars().take(97).collect();
                truncated.push_str("...");
                return (true, Some(truncated));
            }
            if content.contains(':') || content.contains(" - ") {
                issues.push(warn("explanatory_punctuation", "short_text should not contain colon/dash explanations"));
            }
            (true, None)
        }
        DataType::LongText => {
            if content.trim().len() < 10 {
                issues.push(warn("too_short_for_long_text", "long_text is recommended to be at least 10 characters"));
            }
            (true, None)
        }
        DataType::Url => {
            if content.starts_with("http://") || content.starts_with("https://") {
                (true, None)
            } else if content.contains('.') {
                suggestions.push("prefix with https:// since no protocol was present".to_owned());
                (true, Some(format!("https://{content}")))
            } else {
                issues.push(err("not_a_url", "content does not look like a URL"));
                (false, None)
            }
        }
        DataType::Email => {
            if EMAIL_RE.is_match(content) {
                (true, Some(content.to_lowercase()))
            } else {
                issues.push(err("invalid_email", "content does not match an email address pattern"));
                (false, None)
            }
        }
        DataType::Number => {
            if content.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                (true, None)
            } else {
                issues.push(err("not_a_number", "content is not a parseable, finite number"));
                (false, None)
            }
        }
        DataType::Currency => {
            if CURRENCY_RE.is_match(content.trim()) {
                (true, None)
            } else {
                issues.push(err("not_currency", "content does not look like a currency amount"));
                (false, None)
            }
        }
        DataType::Date => {
            let t = content.trim();
            if DATE_ISO_RE.is_match(t) || DATE_LONG_RE.is_match(t) || DATE_SLASH_RE.is_match(t) {
                (true, None)
            } else {
                issues.push(err("not_a_date", "content does not match YYYY-MM-DD, 'Month D, YYYY' or M/D/YYYY"));
                (false, None)
            }
        }
        DataType::Boolean => {
            let normalized = content.trim().to_lowercase();
            match normalized.as_str() {
                "yes" | "true" | "1" | "y" => (true, Some("Yes".to_owned())),
                "no" | "false" | "0" | "n" => (true, Some("No".to_owned())),
                _ => {
                    issues.push(err("not_a_boolean", "content is not a recognized yes/no/true/false value"));
                    (false, None)
                }
            }
        }
        DataType::List => {
            if content.contains(',') || content.contains(';') || content.contains('\n') {
                let rejoined: Vec<&str> = content
                    .split([',', ';', '\n'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                (true, Some(rejoined.join(", ")))
            } else {
                issues.push(warn("not_list_like", "content does not contain a comma, semicolon or newline separator"));
                (true, None)
            }
        }
        DataType::Person => {
            if PERSON_RE.is_match(content.trim()) {
                (true, None)
            } else {
                issues.push(err("not_a_person_name", "content does not look like a person's full name (>= 2 capitalized words)"));
                (false, None)
            }
        }
        DataType::Company => {
            let lower = content.to_lowercase();
            let has_keyword = COMPANY_KEYWORDS.iter().any(|kw| lower.contains(kw));
            let starts_capital = content.chars().next().is_some_and(char::is_uppercase);
            if has_keyword || starts_capital {
                (true, None)
            } else {
                issues.push(warn("weak_company_signal", "content lacks a company keyword or initial capital"));
                (true, None)
            }
        }
        DataType::Json => {
            if serde_json::from_str::<serde_json::Value>(content).is_ok() {
                (true, None)
            } else {
                issues.push(err("invalid_json", "content does not parse as JSON"));
                (false, None)
            }
        }
    }
}

/// Keyword overlap between the column title's tokens and the content's
/// tokens, as a fraction of the title's distinct tokens.
fn relevance_score(title: &str, content: &str) -> f64 {
    let title_tokens: HashSet<String> = tokenize(title);
    if title_tokens.is_empty() {
        return 1.0;
    }
    let content_tokens: HashSet<String> = tokenize(content);
    let overlap = title_tokens.intersection(&content_tokens).count();
    overlap as f64 / title_tokens.len() as f64
}

fn tokenize(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_owned)
        .collect()
}

/// Human-readable requirement text for the contextual prompt's FORMAT
/// REQUIREMENTS section.
pub fn format_requirements_text(column: &Column) -> String {
    let base = match column.data_type {
        DataType::ShortText => "A short phrase, under 100 characters, with no colon/dash explanations.",
        DataType::LongText => "A paragraph of at least a few sentences.",
        DataType::Url => "A single fully-qualified http(s):// URL.",
        DataType::Email => "A single valid email address.",
        DataType::Number => "A single parseable, finite number.",
        DataType::Currency => "A currency amount, optionally prefixed with a currency symbol.",
        DataType::Date => "A date as YYYY-MM-DD, 'Month D, YYYY', or M/D/YYYY.",
        DataType::Boolean => "Yes or No.",
        DataType::List => "A comma-, semicolon- or newline-separated list of items.",
        DataType::Person => "A full person name (first and last name, capitalized).",
        DataType::Company => "A company name.",
        DataType::Json => "A single valid JSON value.",
    };
    let mut out = base.to_owned();
    if let Some(max_length) = column.max_length {
        out.push_str(&format!(" Maximum length: {max_length} characters."));
    }
    if let Some(min_length) = column.min_length {
        out.push_str(&format!(" Minimum length: {min_length} characters."));
    }
    if let Some(examples) = &column.examples
        && !examples.is_empty()
    {
        out.push_str(&format!(" Examples: {}.", examples.join("; ")));
    }
    out
}

/// The declared expected-pairing table (spec.md §4.4.3). Unusual
/// (operator, data_type) combinations produce a human-readable warning
/// appended to the contextual prompt; they never block dispatch.
pub fn compatibility_warning(operator: OperatorName, data_type: DataType) -> Option<String> {
    use DataType::*;
    use OperatorName::*;

    let expected = match operator {
        GoogleSearch => matches!(data_type, Url | ShortText | Company | Person),
        UrlContext => matches!(data_type, LongText | ShortText | Json),
        StructuredOutput => true, // flexible: no inherent mismatch
        FunctionCalling => matches!(data_type, Json | ShortText | LongText),
        SimilarityExpansion => matches!(data_type, List | ShortText),
        AcademicSearch => matches!(data_type, Url | LongText | ShortText),
    };

    if expected {
        None
    } else {
        Some(format!(
            "operator '{operator}' is an unusual fit for data type '{data_type}'; double-check the produced format"
        ))
    }
}

/// `generateImprovementPrompt` (spec.md §4.4.4): prepends a RETRY header
/// listing issues/suggestions, then the data-type requirement, then
/// length/examples, then the original prompt verbatim.
pub fn generate_improvement_prompt(original_prompt: &str, column: &Column, validation: &ValidationResult) -> String {
    let mut out = String::new();
    out.push_str("RETRY\n");
    out.push_str("ISSUES:\n");
    if validation.issues.is_empty() {
        out.push_str("- low confidence in the previous result\n");
    } else {
        for i in &validation.issues {
            out.push_str(&format!("- [{}] {}\n", i.issue_type, i.message));
        }
    }
    if !validation.suggestions.is_empty() {
        out.push_str("SUGGESTIONS:\n");
        for s in &validation.suggestions {
            out.push_str(&format!("- {s}\n"));
        }
    }
    out.push_str("REQUIREMENTS:\n");
    out.push_str(&format_requirements_text(column));
    out.push('\n');
    out.push_str(original_prompt);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fill_protocol::OperatorType;
    use uuid::Uuid;

    fn col(data_type: DataType) -> Column {
        Column {
            id: Uuid::nil(),
            sheet_id: Uuid::nil(),
            position: 1,
            title: "CEO".to_owned(),
            data_type,
            operator_type: Some(OperatorType::StructuredOutput),
            prompt: None,
            operator_config: None,
            max_length: None,
            min_length: None,
            examples: None,
            description: None,
            required: true,
        }
    }

    #[test]
    fn rejects_non_person_as_hard_error() {
        let v = validate("The company has great leadership", &col(DataType::Person));
        assert!(!v.valid);
        assert!(v.has_hard_error());
    }

    #[test]
    fn accepts_person_name() {
        let v = validate("Sundar Pichai", &col(DataType::Person));
        assert!(v.valid);
    }

    #[test]
    fn empty_required_field_is_invalid() {
        let v = validate("", &col(DataType::ShortText));
        assert!(!v.valid);
    }

    #[test]
    fn number_hard_fails_on_text() {
        let v = validate("not a number", &col(DataType::Number));
        assert!(!v.valid);
    }

    #[test]
    fn boolean_normalizes_to_yes_no() {
        let v = validate("TRUE", &col(DataType::Boolean));
        assert!(v.valid);
        assert_eq!(v.sanitized.as_deref(), Some("Yes"));
    }

    #[test]
    fn url_without_protocol_is_sanitized_not_rejected() {
        let v = validate("example.com/page", &col(DataType::Url));
        assert!(v.valid);
        assert_eq!(v.sanitized.as_deref(), Some("https://example.com/page"));
    }

    #[test]
    fn validate_is_pure() {
        let c = col(DataType::ShortText);
        let a = validate("hello world", &c);
        let b = validate("hello world", &c);
        assert_eq!(a, b);
    }

    #[test]
    fn low_relevance_lowers_confidence_but_stays_valid() {
        let v = validate("banana smoothie recipe", &col(DataType::ShortText));
        assert!(v.valid);
        assert!(v.confidence < 1.0);
    }
}
