use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::column::Column;
use crate::sheet::TemplateType;

/// Ephemeral, per-event context resolved at dispatch time. Rebuilt on
/// every event rather than cached, because row state changes between
/// events; a re-implementation must not cache columns or row data across
/// events without invalidation keyed on `cells.updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetContext {
    pub sheet_id: Uuid,
    pub template_type: TemplateType,
    pub system_prompt: Option<String>,
    /// Ordered by `position`, dense from 0.
    pub columns: Vec<Column>,
    pub row_index: i32,
    /// The source column of the event that produced this context.
    pub current_column_index: i32,
    pub row_data: BTreeMap<i32, String>,
}

impl SheetContext {
    /// The column this fill step must populate.
    pub fn target_column_index(&self) -> i32 {
        self.current_column_index + 1
    }

    pub fn target_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.position == self.target_column_index())
    }

    pub fn is_last_column(&self, col_index: i32) -> bool {
        match self.columns.last() {
            Some(last) => col_index >= last.position,
            None => true,
        }
    }

    pub fn value_at(&self, col_index: i32) -> Option<&str> {
        self.row_data.get(&col_index).map(String::as_str)
    }
}
