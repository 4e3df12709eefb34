use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// What triggered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserCellEdit,
    RobotCellUpdate,
    ManualTrigger,
}

/// `pending -> processing -> {completed, failed}`. A single dispatcher
/// instance holds any given event in `processing` at a time (enforced by
/// `claim`'s `SELECT ... FOR UPDATE SKIP LOCKED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Opaque per-`eventType` payload. Minimally carries the content of the
/// source cell that triggered the fill, plus `manual_trigger` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    CellEdit {
        content: String,
    },
    ManualTrigger {
        trigger_type: String,
        parameters: serde_json::Value,
    },
}

impl EventPayload {
    /// The content that should seed the next operator's input, regardless
    /// of which payload variant produced this event.
    pub fn source_content(&self) -> &str {
        match self {
            Self::CellEdit { content } => content,
            Self::ManualTrigger { .. } => "",
        }
    }
}

/// A durable, status-tracked unit of fill work. `col_index` is the
/// *source* column whose presence triggers filling `col_index + 1` — the
/// resolution this repository picked for the open question in spec.md §9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub sheet_id: Uuid,
    pub row_index: i32,
    pub col_index: i32,
    pub event_type: EventType,
    pub payload: EventPayload,
    pub status: EventStatus,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
