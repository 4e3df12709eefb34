//! The event queue: durable, at-least-once delivery of fill tasks.
//!
//! Modeled on the teacher's `output-worker/src/pg.rs`, which claims
//! `webhook.request_attempt` rows with `SELECT ... FOR UPDATE SKIP
//! LOCKED` under a transaction. Here the same pattern claims a *batch* of
//! `event_queue` rows rather than one row at a time, because the
//! dispatcher fans a claimed batch out to `parallelism` concurrent
//! pipeline tasks instead of looping one attempt per unit.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use fill_protocol::{Event, EventPayload, EventStatus, EventType};

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    sheet_id: Uuid,
    row_index: i32,
    col_index: i32,
    event_type: String,
    payload: serde_json::Value,
    status: String,
    retry_count: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for Event {
    type Error = sqlx::Error;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type: EventType = row
            .event_type
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(std::io::Error::other(format!("{e}")))))?;
        let status: EventStatus = row
            .status
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(std::io::Error::other(format!("{e}")))))?;
        let payload: EventPayload = serde_json::from_value(row.payload).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::other(format!(
                "invalid event payload: {e}"
            ))))
        })?;

        Ok(Event {
            id: row.id,
            sheet_id: row.sheet_id,
            row_index: row.row_index,
            col_index: row.col_index,
            event_type,
            payload,
            status,
            retry_count: row.retry_count,
            last_error: row.last_error,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

/// Atomic insert with `status = pending`, `retry_count = 0`.
pub async fn enqueue(
    pool: &PgPool,
    sheet_id: Uuid,
    row_index: i32,
    col_index: i32,
    event_type: EventType,
    payload: &EventPayload,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::now_v7();
    let payload_json = serde_json::to_value(payload).expect("EventPayload always serializes");

    sqlx::query(
        "
            INSERT INTO event_queue
                (event_id, sheet_id, row_index, col_index, event_type, payload, status, retry_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', 0, statement_timestamp())
        ",
    )
    .bind(id)
    .bind(sheet_id)
    .bind(row_index)
    .bind(col_index)
    .bind(event_type.to_string())
    .bind(payload_json)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Atomically select up to `limit` `pending` events, oldest first, and
/// transition them to `processing`. Safe under concurrent dispatchers:
/// `FOR UPDATE SKIP LOCKED` means two dispatchers racing this query never
/// claim the same row.
pub async fn claim(pool: &PgPool, limit: u32) -> Result<Vec<Event>, sqlx::Error> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    let rows: Vec<EventRow> = sqlx::query_as(
        "
            SELECT event_id AS id, sheet_id, row_index, col_index, event_type, payload, status,
                   retry_count, last_error, created_at, processed_at
            FROM event_queue
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        ",
    )
    .bind(i64::from(limit))
    .fetch_all(&mut *tx)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    if !ids.is_empty() {
        sqlx::query("UPDATE event_queue SET status = 'processing' WHERE event_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    rows.into_iter().map(Event::try_from).collect()
}

/// `processing -> completed`, stamping `processed_at`.
pub async fn complete(pool: &PgPool, event_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE event_queue SET status = 'completed', processed_at = statement_timestamp() WHERE event_id = $1",
    )
    .bind(event_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// `processing -> failed`, persisting `last_error`.
pub async fn fail(pool: &PgPool, event_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE event_queue SET status = 'failed', last_error = $2, processed_at = statement_timestamp() WHERE event_id = $1",
    )
    .bind(event_id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Bump `retry_count` by 1 without changing `status`.
pub async fn increment_retry(pool: &PgPool, event_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE event_queue SET retry_count = retry_count + 1 WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn read_retry_count(pool: &PgPool, event_id: Uuid) -> Result<i32, sqlx::Error> {
    let row = sqlx::query("SELECT retry_count FROM event_queue WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("retry_count")?)
}

/// Force-complete events stuck in `pending` or `processing` past
/// `older_than`. The system prefers forward progress over a perfectly
/// correct single fill: a stuck row is left with an empty chain rather
/// than holding an event hot forever.
pub async fn reap(pool: &PgPool, older_than: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "
            UPDATE event_queue
            SET status = 'completed', processed_at = statement_timestamp()
            WHERE status IN ('pending', 'processing') AND created_at < $1
        ",
    )
    .bind(older_than)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
