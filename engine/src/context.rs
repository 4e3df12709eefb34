//! Resolves the ephemeral `SheetContext` for one event. Rebuilt on every
//! event rather than cached — row state changes between events.

use std::collections::BTreeMap;

use sqlx::PgPool;
use uuid::Uuid;

use fill_protocol::{Column, DataType, OperatorType, SheetContext, TemplateType};

use crate::error::PipelineError;

#[derive(sqlx::FromRow)]
struct SheetRow {
    template_type: String,
    system_prompt: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ColumnRow {
    id: Uuid,
    sheet_id: Uuid,
    position: i32,
    title: String,
    data_type: String,
    operator_type: Option<String>,
    prompt: Option<String>,
    operator_config: Option<serde_json::Value>,
    max_length: Option<i32>,
    min_length: Option<i32>,
    examples: Option<serde_json::Value>,
    description: Option<String>,
    required: bool,
}

fn parse_enum<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, PipelineError> {
    raw.parse()
        .map_err(|_| PipelineError::Configuration(format!("unknown {what}: {raw}")))
}

impl TryFrom<ColumnRow> for Column {
    type Error = PipelineError;

    fn try_from(row: ColumnRow) -> Result<Self, Self::Error> {
        let data_type: DataType = parse_enum(&row.data_type, "data_type")?;
        let operator_type: Option<OperatorType> = row
            .operator_type
            .as_deref()
            .map(|s| parse_enum(s, "operator_type"))
            .transpose()?;
        let examples = row
            .examples
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| PipelineError::Configuration(format!("invalid examples: {e}")))?;

        Ok(Column {
            id: row.id,
            sheet_id: row.sheet_id,
            position: row.position,
            title: row.title,
            data_type,
            operator_type,
            prompt: row.prompt,
            operator_config: row.operator_config,
            max_length: row.max_length.map(|v| v as usize),
            min_length: row.min_length.map(|v| v as usize),
            examples,
            description: row.description,
            required: row.required,
        })
    }
}

/// Load the sheet's template/system prompt, its dense ordered columns,
/// and the row's currently-written cells, and assemble a `SheetContext`
/// whose target is `source_col_index + 1`.
pub async fn resolve(
    pool: &PgPool,
    sheet_id: Uuid,
    row_index: i32,
    source_col_index: i32,
) -> Result<SheetContext, PipelineError> {
    let sheet: SheetRow = sqlx::query_as("SELECT template_type, system_prompt FROM sheets WHERE sheet_id = $1")
        .bind(sheet_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PipelineError::Configuration(format!("sheet {sheet_id} not found")))?;

    let column_rows: Vec<ColumnRow> = sqlx::query_as(
        "
            SELECT column_id AS id, sheet_id, position, title, data_type, operator_type, prompt,
                   operator_config, max_length, min_length, examples, description, required
            FROM columns
            WHERE sheet_id = $1
            ORDER BY position ASC
        ",
    )
    .bind(sheet_id)
    .fetch_all(pool)
    .await?;
    let columns = column_rows
        .into_iter()
        .map(Column::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let cell_rows: Vec<(i32, String)> = sqlx::query_as(
        "SELECT col_index, content FROM cells WHERE sheet_id = $1 AND row_index = $2",
    )
    .bind(sheet_id)
    .bind(row_index)
    .fetch_all(pool)
    .await?;
    let row_data: BTreeMap<i32, String> = cell_rows.into_iter().collect();

    let template_type: TemplateType = parse_enum(&sheet.template_type, "template_type")?;

    Ok(SheetContext {
        sheet_id,
        template_type,
        system_prompt: sheet.system_prompt,
        columns,
        row_index,
        current_column_index: source_col_index,
        row_data,
    })
}
