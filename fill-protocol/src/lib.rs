//! Shared data model for the AI-assisted spreadsheet fill engine.
//!
//! This crate has no I/O of its own: it only defines the entities, enums
//! and operator I/O contracts that the `engine` crate persists, dispatches
//! and validates. Keeping these types dependency-light means they can be
//! reused by an external API layer without pulling in `sqlx`/`tokio`.

mod column;
mod config;
mod context;
mod event;
mod operator;
mod sheet;
mod status;
mod validation;

pub use column::{Column, DataType, OperatorType};
pub use config::EngineConfig;
pub use context::SheetContext;
pub use event::{Event, EventPayload, EventStatus, EventType};
pub use operator::{
    AcademicResult, AcademicSearchInput, AcademicSearchOutput, FunctionCallingInput,
    FunctionCallingOutput, FunctionCallResult, FunctionDeclaration, GoogleSearchInput,
    GoogleSearchOutput, Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput,
    SearchResult, SimilarityExpansionInput, SimilarityExpansionOutput, StructuredOutputInput,
    StructuredOutputOutput, UrlContextInput, UrlContextOutput, UrlEnrichment,
};
pub use sheet::{TemplateType, UpdateType};
pub use status::{CellProcessingStatus, CellStatus};
pub use validation::{ValidationIssue, ValidationResult, ValidationSeverity};
