use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The format contract a column cell's content is validated and prompted
/// against. See the validator's per-type rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    ShortText,
    LongText,
    Url,
    Email,
    Number,
    Currency,
    Date,
    Boolean,
    List,
    Person,
    Company,
    Json,
}

/// The operator a column declares to produce its cell values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperatorType {
    GoogleSearch,
    UrlContext,
    StructuredOutput,
    FunctionCalling,
    SimilarityExpansion,
    AcademicSearch,
}

/// A column blueprint. Columns are immutable to the core engine; they are
/// owned and maintained by the template/sheet layer (out of scope here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: Uuid,
    pub sheet_id: Uuid,
    /// Dense, zero-based position within the sheet. Position 0 is the seed
    /// column and never carries an operator.
    pub position: i32,
    pub title: String,
    pub data_type: DataType,
    pub operator_type: Option<OperatorType>,
    /// Freeform instructions folded into the contextual prompt's TASK section.
    pub prompt: Option<String>,
    /// Opaque, operator-specific configuration (e.g. `maxResults`, `domain`).
    pub operator_config: Option<serde_json::Value>,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub examples: Option<Vec<String>>,
    pub description: Option<String>,
    pub required: bool,
}
