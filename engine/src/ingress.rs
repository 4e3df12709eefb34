//! Ingress API surface exposed to external collaborators (spec.md §6):
//! the UI / edit layer is the only caller, and is itself out of scope.

use sqlx::PgPool;
use uuid::Uuid;

use fill_protocol::{EventPayload, EventType, UpdateType};

use crate::{audit, queue};

/// Creates a `user_cell_edit` event and writes the seed cell.
pub async fn enqueue_cell_edit(
    pool: &PgPool,
    sheet_id: Uuid,
    row_index: i32,
    col_index: i32,
    content: &str,
) -> Result<Uuid, sqlx::Error> {
    audit::write_cell(pool, sheet_id, row_index, col_index, content, UpdateType::UserEdit).await?;

    let payload = EventPayload::CellEdit { content: content.to_owned() };
    queue::enqueue(pool, sheet_id, row_index, col_index, EventType::UserCellEdit, &payload).await
}

/// Creates a `manual_trigger` event. Carries no seed cell write of its
/// own — the target column's content is produced entirely by the
/// operator the trigger selects (see `selection::operator_for_trigger`).
pub async fn enqueue_manual_trigger(
    pool: &PgPool,
    sheet_id: Uuid,
    row_index: i32,
    col_index: i32,
    trigger_type: &str,
    parameters: serde_json::Value,
) -> Result<Uuid, sqlx::Error> {
    let payload = EventPayload::ManualTrigger {
        trigger_type: trigger_type.to_owned(),
        parameters,
    };
    queue::enqueue(pool, sheet_id, row_index, col_index, EventType::ManualTrigger, &payload).await
}

/// Writes cells for columns `0..row.len()` of each row and enqueues one
/// `user_cell_edit` event per row on column 0, so each row's chain starts
/// independently (spec.md §6, §5 "across rows: no ordering").
pub async fn bulk_create_rows(
    pool: &PgPool,
    sheet_id: Uuid,
    rows: &[Vec<String>],
    starting_row_index: i32,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let mut event_ids = Vec::with_capacity(rows.len());

    for (offset, row) in rows.iter().enumerate() {
        let row_index = starting_row_index + offset as i32;
        for (col_index, content) in row.iter().enumerate() {
            audit::write_cell(pool, sheet_id, row_index, col_index as i32, content, UpdateType::UserEdit).await?;
        }

        if let Some(seed) = row.first() {
            let payload = EventPayload::CellEdit { content: seed.clone() };
            let id = queue::enqueue(pool, sheet_id, row_index, 0, EventType::UserCellEdit, &payload).await?;
            event_ids.push(id);
        }
    }

    Ok(event_ids)
}
