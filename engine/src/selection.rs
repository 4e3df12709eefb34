//! Operator selection heuristics (spec.md §4.2.2–§4.2.3).
//!
//! These are pure functions over the source event's content and the
//! target column, so they're unit-tested directly without a database.

use std::sync::LazyLock;

use regex::Regex;

use fill_protocol::{OperatorName, TemplateType};

static ACADEMIC_KEYWORDS: &[&str] = &[
    "research",
    "paper",
    "study",
    "journal",
    "article",
    "academic",
    "scholar",
    "citation",
    "doi",
    "arxiv",
    "pubmed",
    "peer-reviewed",
];

static ACADEMIC_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(research:|find papers|literature review)").unwrap());

static SEARCH_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(search:|find:|query:|what is|who is|where is|when is|how to)").unwrap()
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// True iff `content` contains at least one academic-signal keyword or
/// matches the academic prefix pattern.
pub fn is_academic_signal(content: &str) -> bool {
    let lower = content.to_lowercase();
    ACADEMIC_KEYWORDS.iter().any(|kw| lower.contains(kw)) || ACADEMIC_PREFIX_RE.is_match(content)
}

/// `/^(search:|find:|query:|what is|who is|where is|when is|how to)/i`, or
/// contains `?` and is under 200 characters.
pub fn is_search_query(content: &str) -> bool {
    SEARCH_PREFIX_RE.is_match(content) || (content.contains('?') && content.len() < 200)
}

pub fn contains_url(content: &str) -> bool {
    URL_RE.is_match(content)
}

/// Resolve the operator for a `manual_trigger` event's `trigger_type`.
/// Unknown triggers fall back to `structured_output`.
pub fn operator_for_trigger(trigger_type: &str) -> OperatorName {
    match trigger_type {
        "google_search" => OperatorName::GoogleSearch,
        "url_context" => OperatorName::UrlContext,
        "structured_output" => OperatorName::StructuredOutput,
        "function_calling" => OperatorName::FunctionCalling,
        "similarity_expansion" => OperatorName::SimilarityExpansion,
        "academic_search" => OperatorName::AcademicSearch,
        _ => OperatorName::StructuredOutput,
    }
}

/// The strict priority list from spec.md §4.2.2, given that the target
/// column does *not* declare an explicit `operator_type`. Under a
/// scientific template, any content routes to `academic_search` — a
/// scientific sheet's columns are filled from the literature even when
/// the seed is a bare noun phrase rather than a search-shaped query.
pub fn heuristic_operator(content: &str, template_type: TemplateType) -> OperatorName {
    if template_type == TemplateType::Scientific {
        OperatorName::AcademicSearch
    } else if is_academic_signal(content) {
        OperatorName::AcademicSearch
    } else if is_search_query(content) {
        OperatorName::GoogleSearch
    } else if contains_url(content) {
        OperatorName::UrlContext
    } else {
        OperatorName::StructuredOutput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_academic_keywords() {
        assert!(is_academic_signal("please find the arxiv paper on BERT"));
        assert!(is_academic_signal("research: transformer architectures"));
        assert!(!is_academic_signal("quantum computing"));
    }

    #[test]
    fn detects_search_queries() {
        assert!(is_search_query("what is quantum computing"));
        assert!(is_search_query("search: rust async runtimes"));
        assert!(is_search_query("is this thing on?"));
        assert!(!is_search_query(&"a".repeat(250)));
    }

    #[test]
    fn detects_urls() {
        assert!(contains_url("see https://example.com/page for details"));
        assert!(!contains_url("no link here"));
    }

    #[test]
    fn priority_prefers_scientific_academic_over_search() {
        let op = heuristic_operator("BERT transformer", TemplateType::Scientific);
        assert_eq!(op, OperatorName::AcademicSearch);
    }

    #[test]
    fn priority_falls_back_to_structured_output() {
        let op = heuristic_operator("Sundar Pichai", TemplateType::Generic);
        assert_eq!(op, OperatorName::StructuredOutput);
    }

    #[test]
    fn priority_prefers_url_over_structured_output() {
        let op = heuristic_operator("homepage: https://openai.com", TemplateType::Generic);
        assert_eq!(op, OperatorName::UrlContext);
    }

    #[test]
    fn unknown_manual_trigger_falls_back() {
        assert_eq!(
            operator_for_trigger("something_unheard_of"),
            OperatorName::StructuredOutput
        );
    }
}
