use async_trait::async_trait;

use fill_protocol::{AcademicResult, AcademicSearchOutput, Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput};

use super::StubBackend;

#[derive(Debug, Default, Clone, Copy)]
pub struct AcademicSearchOperator(StubBackend);

#[async_trait]
impl Operator for AcademicSearchOperator {
    fn name(&self) -> OperatorName {
        OperatorName::AcademicSearch
    }

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let OperatorInput::AcademicSearch(input) = input else {
            return Err(OperatorError::InvalidInput("expected academic_search input".to_owned()));
        };
        if input.topic.trim().is_empty() {
            return Err(OperatorError::InvalidInput("topic must not be empty".to_owned()));
        }

        let max_results = input.max_results.unwrap_or(5).max(1).min(20);
        let fingerprint = StubBackend::fingerprint(&input.topic);
        let min_year = input.year_range.map_or(2015, |(start, _)| start);

        let results: Vec<AcademicResult> = (0..max_results)
            .map(|i| {
                let citations = 50 + ((fingerprint.wrapping_add(i as u64) % 5000) as u32);
                let is_pdf_direct = i == 0;
                AcademicResult {
                    title: format!("{}: a study (part {})", input.topic, i + 1),
                    url: if is_pdf_direct {
                        format!("https://example-academic-source.test/{i}.pdf")
                    } else {
                        format!("https://example-academic-source.test/{i}")
                    },
                    estimated_citations: Some(citations),
                    publication_year: Some(min_year + (i as i32)),
                    journal: input.research_field.clone(),
                    is_pdf_direct,
                    is_high_impact: citations > 500,
                    academic_source: "example-academic-source".to_owned(),
                }
            })
            .filter(|r| input.min_citations.is_none_or(|min| r.estimated_citations.unwrap_or(0) >= min))
            .collect();

        let total_pdfs_found = results.iter().filter(|r| r.is_pdf_direct).count();
        let average_citations = if results.is_empty() {
            None
        } else {
            Some(results.iter().filter_map(|r| r.estimated_citations).sum::<u32>() as f64 / results.len() as f64)
        };

        Ok(OperatorOutput::AcademicSearch(AcademicSearchOutput {
            results: results.clone(),
            academic_results: results,
            total_pdfs_found,
            average_citations,
        }))
    }
}
