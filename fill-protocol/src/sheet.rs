use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A template family. Beyond `Scientific`, templates bias operator
/// selection and inject a fixed focus block into the contextual prompt;
/// the others carry no behavioral bias in the core engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    #[default]
    Generic,
    Marketing,
    Scientific,
    Lucky,
    Null,
}

/// The kind of write recorded in the append-only audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// A user-supplied seed value.
    UserEdit,
    /// A value produced by an operator.
    AiResponse,
}
