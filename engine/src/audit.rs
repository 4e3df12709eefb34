//! Cell writes and the append-only `sheet_updates` audit log.
//!
//! The two inserts happen in the same transaction so that "for every
//! write to `cells` by the engine, exactly one `sheet_updates` row with
//! matching (sheet, row, col, content) exists" (spec.md §8, invariant 6)
//! always holds.

use sqlx::PgPool;
use uuid::Uuid;

use fill_protocol::UpdateType;

/// Upsert the cell and append the matching audit row, atomically.
pub async fn write_cell(
    pool: &PgPool,
    sheet_id: Uuid,
    row_index: i32,
    col_index: i32,
    content: &str,
    update_type: UpdateType,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "
            INSERT INTO cells (sheet_id, row_index, col_index, content, updated_at)
            VALUES ($1, $2, $3, $4, statement_timestamp())
            ON CONFLICT (sheet_id, row_index, col_index)
            DO UPDATE SET content = EXCLUDED.content, updated_at = statement_timestamp()
        ",
    )
    .bind(sheet_id)
    .bind(row_index)
    .bind(col_index)
    .bind(content)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "
            INSERT INTO sheet_updates (update_id, sheet_id, row_index, col_index, content, update_type, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6, statement_timestamp())
        ",
    )
    .bind(Uuid::now_v7())
    .bind(sheet_id)
    .bind(row_index)
    .bind(col_index)
    .bind(content)
    .bind(update_type.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
