//! End-to-end search orchestration

use super::assembler::assemble;
use super::citations::check_citations;
use super::extractor::FilterExtractor;
use super::model::{Language, SearchResult};
use super::refiner::refine_by_location;
use super::retriever::CandidateRetriever;
use super::synthesizer::AnswerSynthesizer;
use super::MAX_QUERY_CHARS;
use crate::config::SearchConfig;
use crate::db::PropertyStore;
use crate::errors::{AppError, Result};
use crate::llm::CompletionService;
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Extract -> retrieve -> refine -> synthesize -> assemble, under one
/// deadline
pub struct SearchPipeline {
    extractor: FilterExtractor,
    retriever: CandidateRetriever,
    synthesizer: AnswerSynthesizer,
    store: Arc<dyn PropertyStore>,
    timeout: Duration,
    validate_citations: bool,
}

impl SearchPipeline {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        store: Arc<dyn PropertyStore>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            extractor: FilterExtractor::new(completion.clone()),
            retriever: CandidateRetriever::new(store.clone()),
            synthesizer: AnswerSynthesizer::new(completion),
            store,
            timeout: config.timeout(),
            validate_citations: config.validate_citations,
        }
    }

    /// Override the whole-search deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Store connectivity, for readiness probes
    pub async fn ready(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Answer `query` in `language`.
    ///
    /// Extraction problems degrade to an unfiltered search; store and
    /// synthesis failures, and the deadline, are errors.
    #[instrument(skip(self, query, language), fields(language = %language, query_chars = query.chars().count()))]
    pub async fn search(&self, query: &str, language: Language) -> Result<SearchResult> {
        let query = validate_query(query)?;
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.run(query, language)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::SearchTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        let elapsed = start.elapsed().as_secs_f64();
        match &outcome {
            Ok(result) => {
                metrics::record_search(elapsed, language.as_str(), "success", result.map_pins.len());
                info!(
                    duration_ms = (elapsed * 1000.0) as u64,
                    sources = result.sources.len(),
                    pins = result.map_pins.len(),
                    "Search completed"
                );
            }
            Err(e) => {
                let label = match e {
                    AppError::SearchTimeout { .. } => "timeout",
                    _ => "error",
                };
                metrics::record_search(elapsed, language.as_str(), label, 0);
                warn!(error = %e, duration_ms = (elapsed * 1000.0) as u64, "Search failed");
            }
        }

        outcome
    }

    async fn run(&self, query: &str, language: Language) -> Result<SearchResult> {
        let filters = self.extractor.extract(query).await;

        let candidates = self.retriever.retrieve(&filters).await?;
        let retrieved = candidates.len();

        let refined = refine_by_location(candidates, &filters.location);
        tracing::debug!(retrieved, refined = refined.len(), "Location refinement applied");

        let answer = self.synthesizer.synthesize(query, &refined, language).await?;

        let mut result = assemble(answer, &refined, language);

        if self.validate_citations {
            let check = check_citations(&result.answer, refined.len());
            if !check.is_valid() {
                warn!(invalid = ?check.invalid, context_entries = refined.len(), "Answer cites missing sources");
                metrics::record_invalid_citations(check.invalid.len());
            }
            result.invalid_citations = check.invalid;
        }

        Ok(result)
    }
}

/// Trimmed query, rejected when blank or longer than the accepted maximum
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            message: "Query must not be empty".to_string(),
            field: Some("query".to_string()),
        });
    }
    if trimmed.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::Validation {
            message: format!("Query must be at most {} characters", MAX_QUERY_CHARS),
            field: Some("query".to_string()),
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, UnitQuery};
    use crate::llm::{Completion, CompletionRequest, MockCompletion};
    use crate::search::test_support::{candidate, candidate_in};
    use crate::search::Candidate;
    use async_trait::async_trait;

    const NO_FILTERS: &str =
        r#"{"location":[],"minPrice":null,"maxPrice":null,"bedrooms":null,"propertyType":[]}"#;

    fn pipeline(mock: Arc<MockCompletion>, rows: Vec<Candidate>) -> SearchPipeline {
        SearchPipeline::new(
            mock,
            Arc::new(InMemoryStore::with_candidates(rows)),
            &SearchConfig::default(),
        )
    }

    struct SlowCompletion;

    #[async_trait]
    impl CompletionService for SlowCompletion {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Completion { text: "late".to_string() })
        }

        fn provider(&self) -> &str {
            "slow"
        }
    }

    struct DownStore;

    #[async_trait]
    impl PropertyStore for DownStore {
        async fn find_candidates(&self, _query: &UnitQuery) -> Result<Vec<Candidate>> {
            Err(AppError::DatabaseConnection {
                message: "pool timed out".to_string(),
            })
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::DatabaseConnection {
                message: "pool timed out".to_string(),
            })
        }
    }

    #[test]
    fn test_query_validation() {
        assert_eq!(validate_query("  villa  ").unwrap(), "villa");
        assert!(validate_query("   ").is_err());
        assert!(validate_query(&"ش".repeat(MAX_QUERY_CHARS)).is_ok());
        assert!(validate_query(&"a".repeat(MAX_QUERY_CHARS + 1)).is_err());
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_calls() {
        let mock = Arc::new(MockCompletion::new());
        let err = pipeline(mock.clone(), vec![]).search(" ", Language::En).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_garbled_extraction_still_answers() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_response("not json at all")
                .with_response("Here are some options [1] [2]."),
        );
        let rows = vec![candidate("A", 1_000_000), candidate("B", 2_000_000)];

        let result = pipeline(mock.clone(), rows).search("anything", Language::En).await.unwrap();
        assert_eq!(result.answer, "Here are some options [1] [2].");
        assert_eq!(result.map_pins.len(), 2);
        assert!(result.invalid_citations.is_empty());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_location_refinement_feeds_synthesis() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_response(r#"{"location":["zayed"],"minPrice":null,"maxPrice":null,"bedrooms":null,"propertyType":[]}"#)
                .with_response("Allegria [1]."),
        );
        let rows = vec![
            candidate_in("Eastown", 1_000_000, "New Cairo", None),
            candidate_in("Allegria", 2_000_000, "Sheikh Zayed", None),
        ];

        let result = pipeline(mock.clone(), rows).search("zayed", Language::En).await.unwrap();
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].name, "Allegria");

        let synthesis = &mock.requests()[1];
        assert!(synthesis.user_content.contains("[1] Allegria"));
        assert!(!synthesis.user_content.contains("Eastown"));
    }

    #[tokio::test]
    async fn test_empty_refinement_still_synthesizes() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_response(r#"{"location":["Hurghada"],"minPrice":null,"maxPrice":null,"bedrooms":null,"propertyType":[]}"#)
                .with_response("Nothing in Hurghada right now."),
        );

        let result = pipeline(mock.clone(), vec![candidate("A", 1)])
            .search("hurghada", Language::En)
            .await
            .unwrap();
        assert_eq!(result.answer, "Nothing in Hurghada right now.");
        assert!(result.sources.is_empty());
        assert!(result.map_pins.is_empty());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_unrepresentable_price_searches_unfiltered() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_response(r#"{"location":[],"minPrice":null,"maxPrice":1e30,"bedrooms":null,"propertyType":[]}"#)
                .with_response("Two options [1] [2]."),
        );
        let rows = vec![candidate("A", 1_000_000), candidate("B", 90_000_000)];

        let result = pipeline(mock.clone(), rows).search("anything goes", Language::En).await.unwrap();
        assert_eq!(result.answer, "Two options [1] [2].");
        assert_eq!(result.sources.len(), 2);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_location_refined_after_the_cap() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_response(r#"{"location":["Zayed"],"minPrice":null,"maxPrice":null,"bedrooms":null,"propertyType":[]}"#)
                .with_response("Nothing in Zayed within the current listings."),
        );
        // Ten cheaper New Cairo units fill the cap; the Zayed unit is 11th
        let mut rows: Vec<Candidate> = (0..10)
            .map(|i| candidate_in("Cairo Unit", 1_000_000 + i, "New Cairo", None))
            .collect();
        rows.push(candidate_in("Allegria", 9_000_000, "Sheikh Zayed", None));

        let result = pipeline(mock.clone(), rows).search("zayed", Language::En).await.unwrap();
        assert!(result.sources.is_empty());
        assert!(result.map_pins.is_empty());
        assert!(!mock.requests()[1].user_content.contains("Allegria"));
    }

    #[tokio::test]
    async fn test_invalid_citations_reported() {
        let mock = Arc::new(MockCompletion::new().with_response(NO_FILTERS).with_response("Try [1] or [٤]."));
        let rows = vec![candidate("A", 1), candidate("B", 2)];

        let result = pipeline(mock, rows).search("q", Language::Ar).await.unwrap();
        assert_eq!(result.answer, "Try [1] or [٤].");
        assert_eq!(result.invalid_citations, vec![4]);
    }

    #[tokio::test]
    async fn test_citation_check_can_be_disabled() {
        let mock = Arc::new(MockCompletion::new().with_response(NO_FILTERS).with_response("See [9]."));
        let config = SearchConfig {
            validate_citations: false,
            ..SearchConfig::default()
        };
        let pipeline = SearchPipeline::new(
            mock,
            Arc::new(InMemoryStore::with_candidates(vec![candidate("A", 1)])),
            &config,
        );

        let result = pipeline.search("q", Language::En).await.unwrap();
        assert!(result.invalid_citations.is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_an_error() {
        let mock = Arc::new(MockCompletion::new().with_response(NO_FILTERS).with_failure("500 from provider"));
        let err = pipeline(mock, vec![candidate("A", 1)])
            .search("q", Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Completion { .. }));
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let mock = Arc::new(MockCompletion::new().with_response(NO_FILTERS));
        let pipeline = SearchPipeline::new(mock.clone(), Arc::new(DownStore), &SearchConfig::default());

        let err = pipeline.search("q", Language::En).await.unwrap_err();
        assert!(err.is_upstream());
        // extraction ran, synthesis never did
        assert_eq!(mock.calls(), 1);
        assert!(pipeline.ready().await.is_err());
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let pipeline = SearchPipeline::new(
            Arc::new(SlowCompletion),
            Arc::new(InMemoryStore::new()),
            &SearchConfig::default(),
        )
        .with_timeout(Duration::from_millis(20));

        let err = pipeline.search("q", Language::En).await.unwrap_err();
        assert!(matches!(err, AppError::SearchTimeout { timeout_ms: 20 }));
    }
}
