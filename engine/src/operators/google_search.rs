use async_trait::async_trait;
use chrono::Utc;

use fill_protocol::{
    GoogleSearchOutput, Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput, SearchResult,
};

use super::StubBackend;

/// Must never invent a URL out of thin air and must filter or flag
/// vendor-specific redirect URLs (spec.md §4.5) — here, the stub always
/// returns a directly-addressable synthetic URL, never a redirect one, so
/// redirect filtering is exercised by the wrapper's sanitizer instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleSearchOperator(StubBackend);

#[async_trait]
impl Operator for GoogleSearchOperator {
    fn name(&self) -> OperatorName {
        OperatorName::GoogleSearch
    }

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let OperatorInput::GoogleSearch(input) = input else {
            return Err(OperatorError::InvalidInput("expected google_search input".to_owned()));
        };
        if input.query.trim().is_empty() {
            return Err(OperatorError::InvalidInput("query must not be empty".to_owned()));
        }

        let slug: String = input
            .query
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        let slug = slug.trim_matches('-').to_owned();

        let max_results = input.max_results.max(1).min(10);
        let results = (0..max_results)
            .map(|i| SearchResult {
                title: format!("{} — result {}", input.query, i + 1),
                url: format!("https://example-search-result.test/{slug}/{i}"),
                snippet: format!("A synthetic summary about {}.", input.query),
            })
            .collect();

        Ok(OperatorOutput::GoogleSearch(GoogleSearchOutput {
            results,
            web_search_queries: vec![input.query],
            timestamp: Utc::now(),
        }))
    }
}
