use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::column::OperatorType;

/// The six concrete operators, named the same way `Column::operator_type`
/// names them, plus the dispatch-table key the controller looks operators
/// up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperatorName {
    GoogleSearch,
    UrlContext,
    StructuredOutput,
    FunctionCalling,
    SimilarityExpansion,
    AcademicSearch,
}

impl From<OperatorType> for OperatorName {
    fn from(value: OperatorType) -> Self {
        match value {
            OperatorType::GoogleSearch => Self::GoogleSearch,
            OperatorType::UrlContext => Self::UrlContext,
            OperatorType::StructuredOutput => Self::StructuredOutput,
            OperatorType::FunctionCalling => Self::FunctionCalling,
            OperatorType::SimilarityExpansion => Self::SimilarityExpansion,
            OperatorType::AcademicSearch => Self::AcademicSearch,
        }
    }
}

/// Errors an operator invocation can surface. These map directly onto the
/// dispatcher's `TransientOperatorError` / `SchemaError` error kinds.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("operator timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("transient error from operator backend: {0}")]
    Transient(String),
    #[error("operator output failed schema validation: {0}")]
    SchemaViolation(String),
    #[error("operator input was invalid: {0}")]
    InvalidInput(String),
}

// --- google_search ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSearchInput {
    pub query: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSearchOutput {
    pub results: Vec<SearchResult>,
    pub web_search_queries: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

// --- url_context -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlContextInput {
    pub urls: Vec<String>,
    pub extraction_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlEnrichment {
    pub url: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlContextOutput {
    pub enriched_data: Vec<UrlEnrichment>,
    pub summary: Option<String>,
}

// --- structured_output ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredOutputInput {
    pub raw_data: serde_json::Value,
    pub output_schema: serde_json::Value,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredOutputOutput {
    pub structured_data: serde_json::Value,
    pub confidence: f64,
    pub raw_response: Option<String>,
}

// --- function_calling ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallingInput {
    pub prompt: String,
    pub available_functions: Vec<FunctionDeclaration>,
    pub tool_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallResult {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallingOutput {
    pub function_calls: Vec<FunctionCallResult>,
    pub response: Option<String>,
    /// Always surfaced, never acted on: execution is an external concern.
    pub requires_execution: bool,
}

// --- similarity_expansion ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityExpansionInput {
    pub concept: String,
    pub expansion_type: String,
    pub max_results: Option<usize>,
    pub domain: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityExpansionOutput {
    pub original_concept: String,
    pub similar_terms: Vec<String>,
    pub synonyms: Option<Vec<String>>,
    pub related_concepts: Option<Vec<String>>,
    pub search_terms: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

// --- academic_search ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicSearchInput {
    pub topic: String,
    pub research_field: Option<String>,
    pub year_range: Option<(i32, i32)>,
    pub min_citations: Option<u32>,
    pub include_reviews: Option<bool>,
    pub author_filter: Option<String>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicResult {
    pub title: String,
    pub url: String,
    pub estimated_citations: Option<u32>,
    pub publication_year: Option<i32>,
    pub journal: Option<String>,
    pub is_pdf_direct: bool,
    pub is_high_impact: bool,
    pub academic_source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicSearchOutput {
    pub results: Vec<AcademicResult>,
    pub academic_results: Vec<AcademicResult>,
    pub total_pdfs_found: usize,
    pub average_citations: Option<f64>,
}

// --- uniform envelopes ---------------------------------------------------

/// Tagged-variant input envelope. A tagged variant plus a small dispatch
/// table is the "polymorphism over six operators" equivalent called for
/// in spec.md §9 — it avoids dynamic binding at the input-construction
/// boundary while `Operator` (below) still lets the controller invoke
/// whichever operator it picked through one trait method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum OperatorInput {
    GoogleSearch(GoogleSearchInput),
    UrlContext(UrlContextInput),
    StructuredOutput(StructuredOutputInput),
    FunctionCalling(FunctionCallingInput),
    SimilarityExpansion(SimilarityExpansionInput),
    AcademicSearch(AcademicSearchInput),
}

impl OperatorInput {
    pub fn name(&self) -> OperatorName {
        match self {
            Self::GoogleSearch(_) => OperatorName::GoogleSearch,
            Self::UrlContext(_) => OperatorName::UrlContext,
            Self::StructuredOutput(_) => OperatorName::StructuredOutput,
            Self::FunctionCalling(_) => OperatorName::FunctionCalling,
            Self::SimilarityExpansion(_) => OperatorName::SimilarityExpansion,
            Self::AcademicSearch(_) => OperatorName::AcademicSearch,
        }
    }

    /// The prompt-like field the wrapper writes the contextual prompt
    /// (or, on retry, the improvement prompt) into.
    pub fn set_prompt_field(&mut self, prompt: String) {
        match self {
            Self::GoogleSearch(i) => i.query = prompt,
            Self::UrlContext(i) => i.extraction_prompt = Some(prompt),
            Self::StructuredOutput(i) => i.prompt = Some(prompt),
            Self::FunctionCalling(i) => i.prompt = prompt,
            Self::SimilarityExpansion(i) => i.concept = prompt,
            Self::AcademicSearch(i) => i.topic = prompt,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum OperatorOutput {
    GoogleSearch(GoogleSearchOutput),
    UrlContext(UrlContextOutput),
    StructuredOutput(StructuredOutputOutput),
    FunctionCalling(FunctionCallingOutput),
    SimilarityExpansion(SimilarityExpansionOutput),
    AcademicSearch(AcademicSearchOutput),
}

/// Uniform operator contract. Implementations are stateless with respect
/// to each other; all shared state flows through the event queue, never
/// through an `Operator` instance.
#[async_trait::async_trait]
pub trait Operator: Send + Sync {
    fn name(&self) -> OperatorName;

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError>;

    /// Optional hook run after a successful `operate`.
    async fn next(&self, _output: &OperatorOutput) {}

    /// Optional hook run when `operate` returns an error.
    async fn on_error(&self, _err: &OperatorError, _input: &OperatorInput) {}
}
