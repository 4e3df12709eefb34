//! `CellProcessingStatus` upserts. Idempotent: repeated identical calls
//! converge to the same stored row.

use sqlx::PgPool;
use uuid::Uuid;

use fill_protocol::CellStatus;

pub async fn upsert(
    pool: &PgPool,
    sheet_id: Uuid,
    row_index: i32,
    col_index: i32,
    status: CellStatus,
    operator_name: Option<&str>,
    status_message: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "
            INSERT INTO cell_processing_status
                (sheet_id, row_index, col_index, status, operator_name, status_message, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, statement_timestamp())
            ON CONFLICT (sheet_id, row_index, col_index)
            DO UPDATE SET
                status = EXCLUDED.status,
                operator_name = EXCLUDED.operator_name,
                status_message = EXCLUDED.status_message,
                updated_at = statement_timestamp()
        ",
    )
    .bind(sheet_id)
    .bind(row_index)
    .bind(col_index)
    .bind(status.to_string())
    .bind(operator_name)
    .bind(status_message)
    .execute(pool)
    .await?;
    Ok(())
}
