use async_trait::async_trait;

use fill_protocol::{Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput, SimilarityExpansionOutput};

use super::StubBackend;

#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityExpansionOperator(StubBackend);

#[async_trait]
impl Operator for SimilarityExpansionOperator {
    fn name(&self) -> OperatorName {
        OperatorName::SimilarityExpansion
    }

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let OperatorInput::SimilarityExpansion(input) = input else {
            return Err(OperatorError::InvalidInput("expected similarity_expansion input".to_owned()));
        };
        if input.concept.trim().is_empty() {
            return Err(OperatorError::InvalidInput("concept must not be empty".to_owned()));
        }

        let n = input.max_results.unwrap_or(5).max(1).min(20);
        let fingerprint = StubBackend::fingerprint(&input.concept);
        let similar_terms: Vec<String> = (0..n)
            .map(|i| format!("{}-related-{}", input.concept, (fingerprint.wrapping_add(i as u64)) % 997))
            .collect();

        Ok(OperatorOutput::SimilarityExpansion(SimilarityExpansionOutput {
            original_concept: input.concept.clone(),
            similar_terms: similar_terms.clone(),
            synonyms: Some(similar_terms.iter().take(2).cloned().collect()),
            related_concepts: Some(similar_terms.iter().skip(2).cloned().collect()),
            search_terms: Some(vec![input.concept.clone()]),
            categories: input.domain.map(|d| vec![d]),
            confidence: 0.75,
            reasoning: Some(format!("expanded '{}' by {:?}", input.concept, input.expansion_type)),
        }))
    }
}
