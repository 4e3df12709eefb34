//! The six operator adapters (spec.md §4.5).
//!
//! The concrete vendor API calls to the LLM are explicitly out of scope
//! (spec.md §1): "the operators are specified by their I/O contract; their
//! implementation details — API shape, model choice, tool grounding — are
//! not." Each adapter here implements the real `Operator` trait and the
//! real input/output shapes, but is backed by `StubBackend`, a
//! deterministic, non-networked stand-in, the same way the teacher's
//! `output-worker/src/work.rs::work` stubs the actual webhook delivery
//! behind a `// TODO: implement actual work here` marker and a simulated
//! result.

mod academic_search;
mod function_calling;
mod google_search;
mod similarity_expansion;
mod structured_output;
mod url_context;

pub use academic_search::AcademicSearchOperator;
pub use function_calling::FunctionCallingOperator;
pub use google_search::GoogleSearchOperator;
pub use similarity_expansion::SimilarityExpansionOperator;
pub use structured_output::StructuredOutputOperator;
pub use url_context::UrlContextOperator;

use std::sync::Arc;

use fill_protocol::{Operator, OperatorName};

/// A deterministic, non-networked stand-in for a vendor LLM/tool call.
/// Derives its output from the input alone, so the same input always
/// produces the same output (useful for tests and for the in-process
/// retry loop, whose second call must behave differently only because the
/// *prompt* changed).
#[derive(Debug, Default, Clone, Copy)]
pub struct StubBackend;

impl StubBackend {
    /// A short, stable fingerprint of `seed`, used to vary stubbed output
    /// without any randomness (forbidden here: operators must be pure
    /// functions of their input, per spec.md §5).
    fn fingerprint(seed: &str) -> u64 {
        seed.bytes().fold(1469598103934665603u64, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(1099511628211)
        })
    }
}

/// Build the dispatch table the controller looks operators up by (spec.md
/// §9: "a tagged-variant representation with a small dispatch table").
pub fn dispatch_table() -> Vec<(OperatorName, Arc<dyn Operator>)> {
    vec![
        (OperatorName::GoogleSearch, Arc::new(GoogleSearchOperator::default()) as Arc<dyn Operator>),
        (OperatorName::UrlContext, Arc::new(UrlContextOperator::default())),
        (OperatorName::StructuredOutput, Arc::new(StructuredOutputOperator::default())),
        (OperatorName::FunctionCalling, Arc::new(FunctionCallingOperator::default())),
        (OperatorName::SimilarityExpansion, Arc::new(SimilarityExpansionOperator::default())),
        (OperatorName::AcademicSearch, Arc::new(AcademicSearchOperator::default())),
    ]
}
