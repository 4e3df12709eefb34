use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Observable fill status of one cell, keyed by `(sheet_id, row_index,
/// col_index)`. Written by the wrapper around every operator invocation;
/// upserts are idempotent (repeated identical calls converge to the same
/// stored row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellProcessingStatus {
    pub sheet_id: Uuid,
    pub row_index: i32,
    pub col_index: i32,
    pub status: CellStatus,
    pub operator_name: Option<String>,
    pub status_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}
