use async_trait::async_trait;

use fill_protocol::{Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput, UrlContextOutput, UrlEnrichment};

/// Must reject non-http(s) URLs (spec.md §4.5).
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlContextOperator;

#[async_trait]
impl Operator for UrlContextOperator {
    fn name(&self) -> OperatorName {
        OperatorName::UrlContext
    }

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let OperatorInput::UrlContext(input) = input else {
            return Err(OperatorError::InvalidInput("expected url_context input".to_owned()));
        };
        if input.urls.is_empty() {
            return Err(OperatorError::InvalidInput("at least one url is required".to_owned()));
        }
        if let Some(bad) = input.urls.iter().find(|u| !u.starts_with("http://") && !u.starts_with("https://")) {
            return Err(OperatorError::InvalidInput(format!("non-http(s) url: {bad}")));
        }

        let enriched_data: Vec<UrlEnrichment> = input
            .urls
            .iter()
            .map(|url| UrlEnrichment {
                url: url.clone(),
                content: format!("Synthetic extracted content for {url}."),
                metadata: serde_json::json!({ "extractedFrom": url }),
            })
            .collect();

        let summary = input
            .extraction_prompt
            .as_deref()
            .map(|p| format!("Summary addressing \"{p}\" across {} page(s).", enriched_data.len()))
            .or_else(|| enriched_data.first().map(|e| e.content.clone()));

        Ok(OperatorOutput::UrlContext(UrlContextOutput { enriched_data, summary }))
    }
}
