//! The operator controller / dispatcher (spec.md §4.2): claims batches of
//! pending events and drives each one through the nine-step pipeline.
//!
//! Structured like the teacher's `output-worker/src/pg.rs::look_for_work`
//! poll loop, generalized from "claim one row, work on it inline" to
//! "claim a batch, fan each row out to its own task bounded by a
//! semaphore" — spec.md §4.2.1 claims a batch and spawns one task per
//! event rather than processing one row per poll.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use fill_protocol::{
    CellStatus, Column, EngineConfig, Event, EventPayload, Operator, OperatorInput, OperatorName,
    SheetContext,
};

use crate::error::PipelineError;
use crate::{context, queue, selection, status, wrapper};

/// The operator dispatch table, keyed by name, as spec.md §9 describes.
pub type OperatorTable = HashMap<OperatorName, Arc<dyn Operator>>;

pub fn build_operator_table() -> OperatorTable {
    crate::operators::dispatch_table().into_iter().collect()
}

/// Poll `pool` for pending events forever, fanning claimed events out to
/// concurrent pipeline tasks bounded by `config.parallelism`. Returns only
/// on an unrecoverable database error from `claim` itself; per-event
/// errors never escape `run_pipeline`.
pub async fn run(pool: PgPool, config: Arc<EngineConfig>, task_tracker: TaskTracker) -> Result<(), sqlx::Error> {
    let operators: Arc<OperatorTable> = Arc::new(build_operator_table());
    let permits = Arc::new(Semaphore::new(config.parallelism as usize));

    info!("dispatcher: beginning poll loop (parallelism={})", config.parallelism);

    loop {
        if task_tracker.is_closed() {
            debug!("dispatcher: task tracker closed, stopping poll loop");
            return Ok(());
        }

        let claimed = queue::claim(&pool, config.claim_batch_size).await?;

        if claimed.is_empty() {
            tokio::time::sleep(config.poll_interval).await;
            continue;
        }

        debug!("dispatcher: claimed {} event(s)", claimed.len());

        for event in claimed {
            let pool = pool.clone();
            let config = config.clone();
            let operators = operators.clone();
            let permits = permits.clone();

            task_tracker.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else { return };
                run_pipeline(&pool, &config, &operators, event).await;
            });
        }
    }
}

/// Background reaper: periodically forces stuck `pending`/`processing`
/// events past `config.reap_after` to `completed` (spec.md §4.1, §5).
pub async fn run_reaper(pool: PgPool, config: Arc<EngineConfig>, task_tracker: TaskTracker) {
    loop {
        if task_tracker.is_closed() {
            return;
        }

        let threshold = chrono::Utc::now() - chrono::Duration::from_std(config.reap_after).unwrap_or_default();
        match queue::reap(&pool, threshold).await {
            Ok(0) => {}
            Ok(n) => warn!("reaper: force-completed {n} stuck event(s)"),
            Err(e) => error!("reaper: query failed: {e}"),
        }

        tokio::time::sleep(Duration::from_secs(30).min(config.reap_after)).await;
    }
}

/// The per-event pipeline from spec.md §4.2.2. Every error path is caught
/// here: nothing ever escapes into the poll loop.
/// Exposed `pub` (rather than private) so integration tests can drive a
/// single event through the pipeline without running the full poll loop.
pub async fn run_pipeline(pool: &PgPool, config: &EngineConfig, operators: &OperatorTable, event: Event) {
    fill_sentry_integration::set_user_from_sheet(&event.sheet_id.to_string());

    if let Err(e) = run_pipeline_inner(pool, config, operators, &event).await {
        error!("event {}: {e}", event.id);
        let _ = status::upsert(
            pool,
            event.sheet_id,
            event.row_index,
            event.col_index + 1,
            CellStatus::Error,
            None,
            Some(&e.to_string()),
        )
        .await;

        match &e {
            PipelineError::RejectedWrite(_) => {
                let _ = queue::complete(pool, event.id).await;
            }
            _ => {
                let _ = queue::fail(pool, event.id, &e.to_string()).await;
            }
        }
    }
}

async fn run_pipeline_inner(
    pool: &PgPool,
    config: &EngineConfig,
    operators: &OperatorTable,
    event: &Event,
) -> Result<(), PipelineError> {
    // 1. Resolve context.
    let ctx = context::resolve(pool, event.sheet_id, event.row_index, event.col_index).await?;

    let target_index = ctx.target_column_index();
    let target = ctx
        .target_column()
        .cloned()
        .ok_or_else(|| PipelineError::Configuration(format!("no column at position {target_index}")))?;

    // 2. Pick operator.
    let operator_name = pick_operator(&ctx, &target, event);
    let operator = operators
        .get(&operator_name)
        .ok_or_else(|| PipelineError::Configuration(format!("no operator registered for {operator_name}")))?;

    // 3. Mark processing.
    status::upsert(
        pool,
        ctx.sheet_id,
        ctx.row_index,
        target.position,
        CellStatus::Processing,
        Some(&operator_name.to_string()),
        Some(&format!("running {operator_name}")),
    )
    .await?;

    // 4. Prepare input.
    let prompt = wrapper::build_contextual_prompt(&ctx, &target, operator_name);
    let mut input = build_operator_input(operator_name, &ctx, &target, &prompt);
    input.set_prompt_field(prompt.clone());

    // 5. Invoke operator.
    let outcome = invoke_with_retry(pool, config, operator.as_ref(), &ctx, &target, input, &prompt, event).await;

    let wrapper_outcome = outcome?;

    // 8. Finalize status.
    let (final_status, message) = if wrapper_outcome.success {
        (CellStatus::Completed, None)
    } else {
        (CellStatus::Error, format_issues(&wrapper_outcome.validation_issues))
    };
    status::upsert(
        pool,
        ctx.sheet_id,
        ctx.row_index,
        target.position,
        final_status,
        Some(&operator_name.to_string()),
        message.as_deref(),
    )
    .await?;

    // 9. Complete event.
    queue::complete(pool, event.id).await?;
    Ok(())
}

fn format_issues(issues: &Option<Vec<fill_protocol::ValidationIssue>>) -> Option<String> {
    issues.as_ref().map(|issues| {
        issues
            .iter()
            .map(|i| format!("{}: {}", i.issue_type, i.message))
            .collect::<Vec<_>>()
            .join("; ")
    })
}

/// Step 2 (spec.md §4.2.2): explicit column operator wins; otherwise fall
/// back to the content heuristics, with `manual_trigger` mapped directly.
fn pick_operator(ctx: &SheetContext, target: &Column, event: &Event) -> OperatorName {
    if let Some(operator_type) = target.operator_type {
        return operator_type.into();
    }

    if let EventPayload::ManualTrigger { trigger_type, .. } = &event.payload {
        return selection::operator_for_trigger(trigger_type);
    }

    selection::heuristic_operator(event.payload.source_content(), ctx.template_type)
}

fn build_operator_input(operator: OperatorName, ctx: &SheetContext, target: &Column, prompt: &str) -> OperatorInput {
    match operator {
        OperatorName::GoogleSearch => OperatorInput::GoogleSearch(fill_protocol::GoogleSearchInput {
            query: prompt.to_owned(),
            max_results: 5,
        }),
        OperatorName::UrlContext => OperatorInput::UrlContext(fill_protocol::UrlContextInput {
            urls: extract_urls(ctx),
            extraction_prompt: Some(prompt.to_owned()),
        }),
        OperatorName::StructuredOutput => OperatorInput::StructuredOutput(fill_protocol::StructuredOutputInput {
            raw_data: serde_json::json!(ctx.row_data),
            output_schema: target.operator_config.clone().unwrap_or(serde_json::json!({})),
            prompt: Some(prompt.to_owned()),
        }),
        OperatorName::FunctionCalling => OperatorInput::FunctionCalling(fill_protocol::FunctionCallingInput {
            prompt: prompt.to_owned(),
            available_functions: vec![fill_protocol::FunctionDeclaration {
                name: "fill_cell".to_owned(),
                description: format!("Fill column '{}'", target.title),
                parameters: serde_json::json!({ "type": "object", "properties": {} }),
            }],
            tool_config: None,
        }),
        OperatorName::SimilarityExpansion => {
            OperatorInput::SimilarityExpansion(fill_protocol::SimilarityExpansionInput {
                concept: prompt.to_owned(),
                expansion_type: "general".to_owned(),
                max_results: Some(5),
                domain: None,
                context: Some(prompt.to_owned()),
            })
        }
        OperatorName::AcademicSearch => OperatorInput::AcademicSearch(fill_protocol::AcademicSearchInput {
            topic: prompt.to_owned(),
            research_field: None,
            year_range: None,
            min_citations: None,
            include_reviews: None,
            author_filter: None,
            max_results: Some(5),
        }),
    }
}

fn extract_urls(ctx: &SheetContext) -> Vec<String> {
    ctx.row_data
        .values()
        .filter(|v| v.starts_with("http://") || v.starts_with("https://"))
        .cloned()
        .collect()
}

/// Steps 5–7: invoke the operator, then — subject to the retry bound —
/// retry once in-process (spec.md §4.2.2 step 7, §7's `TransientOperatorError`
/// recovery). A `TransientOperatorError` retries the same input unchanged
/// (there is no validation-derived improvement prompt for it); a
/// post-validation `needsRetry` retries with the wrapper's improvement
/// prompt. Either way at most one retry cycle, bounded by `maxRetries`.
async fn invoke_with_retry(
    pool: &PgPool,
    config: &EngineConfig,
    operator: &dyn Operator,
    ctx: &SheetContext,
    target: &Column,
    input: OperatorInput,
    original_prompt: &str,
    event: &Event,
) -> Result<wrapper::WrapperOutcome, PipelineError> {
    let output = match operator.operate(input.clone()).await {
        Ok(output) => output,
        Err(e) => {
            operator.on_error(&e, &input).await;
            return retry_after_operator_error(pool, config, operator, ctx, target, input, original_prompt, event, e)
                .await;
        }
    };
    operator.next(&output).await;
    let first = wrapper::write_and_advance(pool, config, ctx, target, &output, original_prompt).await?;

    if !first.needs_retry {
        return Ok(first);
    }

    let retry_count = queue::read_retry_count(pool, event.id).await?;
    let Some(retry_prompt) = &first.retry_prompt else {
        return Ok(first);
    };
    if retry_count as u32 >= config.max_retries {
        return Ok(first);
    }

    queue::increment_retry(pool, event.id).await?;

    let mut retried_input = input;
    retried_input.set_prompt_field(retry_prompt.clone());

    let retried_output = match operator.operate(retried_input.clone()).await {
        Ok(output) => output,
        Err(e) => {
            operator.on_error(&e, &retried_input).await;
            return Err(e.into());
        }
    };
    operator.next(&retried_output).await;
    wrapper::write_and_advance(pool, config, ctx, target, &retried_output, retry_prompt).await
}

/// Recovery path for a `TransientOperatorError` raised by the first
/// `operate` call. Retries the unchanged input once, subject to the
/// retry bound; a non-retryable error (e.g. bad input) propagates
/// immediately.
#[allow(clippy::too_many_arguments)]
async fn retry_after_operator_error(
    pool: &PgPool,
    config: &EngineConfig,
    operator: &dyn Operator,
    ctx: &SheetContext,
    target: &Column,
    input: OperatorInput,
    original_prompt: &str,
    event: &Event,
    first_error: fill_protocol::OperatorError,
) -> Result<wrapper::WrapperOutcome, PipelineError> {
    let pipeline_error = PipelineError::from(first_error);
    if !pipeline_error.is_retryable() {
        return Err(pipeline_error);
    }

    let retry_count = queue::read_retry_count(pool, event.id).await?;
    if retry_count as u32 >= config.max_retries {
        return Err(pipeline_error);
    }

    queue::increment_retry(pool, event.id).await?;

    let output = match operator.operate(input.clone()).await {
        Ok(output) => output,
        Err(e) => {
            operator.on_error(&e, &input).await;
            return Err(e.into());
        }
    };
    operator.next(&output).await;
    wrapper::write_and_advance(pool, config, ctx, target, &output, original_prompt).await
}
