//! The column-aware wrapper (spec.md §4.3): everything around an operator
//! invocation that is not the invocation itself — contextual prompt
//! construction, result extraction, sanitization, validation, the
//! write-through, and successor enqueue.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::PgPool;
use url::Url;

use fill_protocol::{
    Column, EngineConfig, EventPayload, EventType, OperatorName, OperatorOutput, SheetContext,
    UpdateType, ValidationIssue,
};

use crate::error::PipelineError;
use crate::{audit, queue, validator};

/// The wrapper's verdict, matching spec.md §4.3.6 exactly.
#[derive(Debug, Clone)]
pub struct WrapperOutcome {
    pub success: bool,
    pub needs_retry: bool,
    pub validation_issues: Option<Vec<ValidationIssue>>,
    pub retry_prompt: Option<String>,
}

/// Build the deterministic contextual prompt (spec.md §4.3.1).
pub fn build_contextual_prompt(ctx: &SheetContext, target: &Column, operator: OperatorName) -> String {
    let mut out = String::new();

    if let Some(system_prompt) = &ctx.system_prompt {
        out.push_str("GOAL:\n");
        out.push_str(system_prompt);
        out.push_str("\n\n");
    }

    if ctx.template_type == fill_protocol::TemplateType::Scientific {
        out.push_str(
            "SCIENTIFIC FOCUS:\nPrefer peer-reviewed sources. Prefer recent publications. \
             Prefer direct PDF links over landing pages.\n\n",
        );
    }

    out.push_str("COLUMN STRUCTURE:\n");
    for col in &ctx.columns {
        let marker = if col.position == target.position { "-> " } else { "   " };
        let value = ctx.value_at(col.position).unwrap_or("");
        out.push_str(&format!("{marker}[{}] {} = \"{}\"\n", col.position, col.title, value));
    }
    out.push('\n');

    out.push_str("FORMAT REQUIREMENTS:\n");
    out.push_str(&validator::format_requirements_text(target));
    out.push_str("\n\n");

    if let Some(warning) = validator::compatibility_warning(operator, target.data_type) {
        out.push_str("COMPATIBILITY NOTES:\n");
        out.push_str(&warning);
        out.push_str("\n\n");
    }

    out.push_str("TASK:\n");
    out.push_str(&format!("Fill \"{}\" based on the data in this row.", target.title));
    if let Some(column_prompt) = &target.prompt {
        out.push(' ');
        out.push_str(column_prompt);
    }

    out
}

/// Per spec.md §4.3.2: a single *content string* extracted from the
/// operator's structured output.
pub fn extract_content(output: &OperatorOutput, config: &EngineConfig) -> Option<String> {
    match output {
        OperatorOutput::GoogleSearch(o) => o
            .results
            .iter()
            .find(|r| !is_blocked_host(&r.url, config))
            .map(|r| r.url.clone())
            .or_else(|| o.results.first().map(|r| r.title.clone())),
        OperatorOutput::AcademicSearch(o) => {
            let results = if !o.academic_results.is_empty() { &o.academic_results } else { &o.results };
            results
                .iter()
                .find(|r| r.is_pdf_direct || r.url.contains(".pdf"))
                .or_else(|| results.iter().find(|r| r.is_high_impact))
                .or_else(|| results.first())
                .map(|r| r.url.clone())
        }
        OperatorOutput::UrlContext(o) => o
            .summary
            .clone()
            .or_else(|| o.enriched_data.first().map(|e| e.content.clone())),
        OperatorOutput::StructuredOutput(o) => match &o.structured_data {
            serde_json::Value::Object(map) if map.len() == 1 => {
                map.values().next().map(value_to_plain_string)
            }
            other => Some(other.to_string()),
        },
        OperatorOutput::SimilarityExpansion(o) => {
            let n = 5;
            Some(o.similar_terms.iter().take(n).cloned().collect::<Vec<_>>().join(", "))
        }
        OperatorOutput::FunctionCalling(o) => o
            .response
            .clone()
            .or_else(|| o.function_calls.first().map(|c| format!("{}({})", c.name, c.args))),
    }
}

fn value_to_plain_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blocked_host(raw_url: &str, config: &EngineConfig) -> bool {
    Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .is_some_and(|host| config.blocked_url_hosts.contains(&host))
}

static QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('\'', '\''), ('`', '`')];
static SENTINEL_NULLS: &[&str] = &["null", "undefined", "{}", "[]", "none", "n/a"];

/// Strip surrounding quote pairs repeatedly.
fn strip_quotes(mut s: &str) -> &str {
    loop {
        let trimmed = s.trim();
        let stripped = QUOTE_PAIRS.iter().find_map(|(open, close)| {
            let mut chars = trimmed.chars();
            if chars.next() == Some(*open) && trimmed.ends_with(*close) && trimmed.len() >= 2 {
                Some(&trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()])
            } else {
                None
            }
        });
        match stripped {
            Some(inner) if inner.len() != s.len() => s = inner,
            _ => return trimmed,
        }
    }
}

fn normalize_url(content: &str) -> String {
    match Url::parse(content) {
        Ok(url) => url.to_string(),
        Err(_) => content.to_owned(),
    }
}

static ALL_NULL_JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\{(\s*"[^"]+"\s*:\s*null\s*,?)+\s*\}$"#).unwrap());

/// Sanitize a just-extracted content string (spec.md §4.3.3). Idempotent:
/// `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(content: &str, config: &EngineConfig) -> Result<String, PipelineError> {
    let stripped = strip_quotes(content);

    if stripped.starts_with("http://") || stripped.starts_with("https://") {
        if let Some(host) = Url::parse(stripped).ok().and_then(|u| u.host_str().map(str::to_owned))
            && config.blocked_url_hosts.contains(&host)
        {
            return Err(PipelineError::RejectedWrite(format!("blocked redirect host: {host}")));
        }
    }

    let normalized = normalize_url(stripped);
    let trimmed = normalized.trim();

    let lowered = trimmed.to_lowercase();
    if trimmed.is_empty() || SENTINEL_NULLS.contains(&lowered.as_str()) {
        return Err(PipelineError::RejectedWrite("empty or sentinel-null content".to_owned()));
    }
    if ALL_NULL_JSON_OBJECT_RE.is_match(trimmed) {
        return Err(PipelineError::RejectedWrite("all-null JSON object".to_owned()));
    }

    let truncated: String = if trimmed.len() > config.max_cell_length {
        trimmed.chars().take(config.max_cell_length).collect()
    } else {
        trimmed.to_owned()
    };

    Ok(truncated)
}

/// Extract, sanitize, validate, write-through, and enqueue the successor
/// (spec.md §4.3.3–§4.3.5). `RejectedWrite` halts the chain without
/// writing anything or enqueueing a successor; it is returned to the
/// dispatcher, which does not treat it as retryable.
#[allow(clippy::too_many_arguments)]
pub async fn write_and_advance(
    pool: &PgPool,
    config: &EngineConfig,
    ctx: &SheetContext,
    target: &Column,
    output: &OperatorOutput,
    original_prompt: &str,
) -> Result<WrapperOutcome, PipelineError> {
    let extracted = extract_content(output, config)
        .ok_or_else(|| PipelineError::RejectedWrite("operator produced no extractable content".to_owned()))?;

    let sanitized = sanitize(&extracted, config)?;

    let validation = validator::validate(&sanitized, target);
    let to_write = validation
        .sanitized
        .clone()
        .filter(|_| validation.valid)
        .unwrap_or_else(|| sanitized.clone());

    audit::write_cell(pool, ctx.sheet_id, ctx.row_index, target.position, &to_write, UpdateType::AiResponse).await?;

    if !ctx.is_last_column(target.position) {
        let payload = EventPayload::CellEdit { content: to_write.clone() };
        queue::enqueue(pool, ctx.sheet_id, ctx.row_index, target.position, EventType::RobotCellUpdate, &payload)
            .await?;
    }

    let needs_retry = !validation.valid || validation.confidence < config.low_confidence_threshold;
    let retry_prompt = needs_retry.then(|| validator::generate_improvement_prompt(original_prompt, target, &validation));

    Ok(WrapperOutcome {
        success: validation.valid,
        needs_retry,
        validation_issues: (!validation.issues.is_empty()).then_some(validation.issues),
        retry_prompt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn strips_repeated_quote_pairs() {
        assert_eq!(strip_quotes("\"\"hello\"\""), "hello");
        assert_eq!(strip_quotes("'world'"), "world");
    }

    #[test]
    fn sanitize_rejects_blocked_host() {
        let err = sanitize("https://vertexaisearch.cloud.google.com/grounding-api-redirect/ABC", &cfg());
        assert!(matches!(err, Err(PipelineError::RejectedWrite(_))));
    }

    #[test]
    fn sanitize_rejects_sentinel_null() {
        assert!(sanitize("null", &cfg()).is_err());
        assert!(sanitize("  undefined  ", &cfg()).is_err());
    }

    #[test]
    fn sanitize_rejects_all_null_json_object() {
        assert!(sanitize(r#"{"a": null, "b": null}"#, &cfg()).is_err());
    }

    #[test]
    fn sanitize_truncates_to_max_length() {
        let mut config = cfg();
        config.max_cell_length = 5;
        let out = sanitize("abcdefghij", &config).unwrap();
        assert_eq!(out, "abcde");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let config = cfg();
        let once = sanitize("  \"hello world\"  ", &config).unwrap();
        let twice = sanitize(&once, &config).unwrap();
        assert_eq!(once, twice);
    }
}
