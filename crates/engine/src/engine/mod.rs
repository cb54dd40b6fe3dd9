//! Engine facade
//!
//! The exposed entry point: pick a combination strategy, supply fragments
//! and a question, get a run record back. Runs are request-scoped and
//! stateless; nothing persists between calls and the engine never retries a
//! failed generator call.

use crate::assembler::{assemble, RunResult};
use crate::chains::{CombineStrategy, RunOptions};
use crate::retriever::FragmentStore;
use answerforge_common::config::AppConfig;
use answerforge_common::errors::{EngineError, Result};
use answerforge_common::generator::create_generator;
use answerforge_common::metrics::record_run;
use answerforge_common::{Fragment, Generator};
use std::sync::Arc;
use std::time::Instant;

/// The combination engine
pub struct Engine {
    generator: Arc<dyn Generator>,
    default_batch_size: usize,
}

impl Engine {
    /// Create an engine over a generator with the default batch size
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            default_batch_size: answerforge_common::config::EngineConfig::default().batch_size,
        }
    }

    /// Override the default map-phase batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size.max(1);
        self
    }

    /// Create an engine from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let generator = create_generator(&config.generator)?;
        Ok(Self {
            generator,
            default_batch_size: config.engine.batch_size.max(1),
        })
    }

    /// Answer a question over the supplied fragments with the given strategy
    pub async fn run_query(
        &self,
        strategy: CombineStrategy,
        fragments: &[Fragment],
        question: &str,
        options: &RunOptions,
    ) -> Result<RunResult> {
        if fragments.is_empty() {
            return Err(EngineError::Validation {
                message: "at least one fragment is required".to_string(),
            });
        }
        if question.trim().is_empty() {
            return Err(EngineError::Validation {
                message: "question must not be empty".to_string(),
            });
        }

        let batch_size = options.batch_size.unwrap_or(self.default_batch_size).max(1);
        let start = Instant::now();

        tracing::info!(
            strategy = strategy.as_str(),
            fragment_count = fragments.len(),
            batch_size,
            "Starting answering run"
        );

        let result = strategy
            .combine(self.generator.as_ref(), fragments, question, options, batch_size)
            .await;

        let duration = start.elapsed().as_secs_f64();
        record_run(strategy.as_str(), duration, fragments.len(), result.is_ok());

        match result {
            Ok(output) => {
                let run = assemble(output, fragments, options);
                tracing::info!(
                    strategy = strategy.as_str(),
                    run_id = %run.run_id,
                    duration_secs = duration,
                    "Answering run complete"
                );
                Ok(run)
            }
            Err(e) => {
                tracing::warn!(
                    strategy = strategy.as_str(),
                    error = %e,
                    transient = e.is_transient(),
                    "Answering run failed"
                );
                Err(e)
            }
        }
    }

    /// Retrieve fragments for the question from a store, then answer over
    /// them with the given strategy
    pub async fn answer(
        &self,
        store: &dyn FragmentStore,
        strategy: CombineStrategy,
        question: &str,
        options: &RunOptions,
    ) -> Result<RunResult> {
        let fragments = store.retrieve(question).await?;
        self.run_query(strategy, &fragments, question, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::StaticStore;
    use answerforge_common::generator::MockGenerator;
    use std::collections::BTreeSet;

    fn fragments() -> Vec<Fragment> {
        vec![
            Fragment::new("Justice Breyer was thanked for his service.").with_source("1"),
            Fragment::new("The speech covered infrastructure.").with_source("2"),
        ]
    }

    fn engine_with(generator: MockGenerator) -> Engine {
        Engine::new(Arc::new(generator))
    }

    #[tokio::test]
    async fn test_empty_fragments_rejected() {
        let engine = engine_with(MockGenerator::new());

        let err = engine
            .run_query(CombineStrategy::Stuff, &[], "Breyer?", &RunOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let engine = engine_with(MockGenerator::new());

        let err = engine
            .run_query(
                CombineStrategy::Stuff,
                &fragments(),
                "   ",
                &RunOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_stuff_dispatch() {
        let engine = engine_with(MockGenerator::new().with_default_response("He was thanked."));

        let result = engine
            .run_query(
                CombineStrategy::Stuff,
                &fragments(),
                "Breyer?",
                &RunOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.final_answer.text, "He was thanked.");
        assert!(result.intermediate_steps.is_none());
    }

    #[tokio::test]
    async fn test_map_reduce_steps_when_requested() {
        let generator = MockGenerator::new()
            .with_response("Justice Breyer", "He was thanked.")
            .with_response("infrastructure", "no answer")
            .with_response("extracted portions", "The president thanked him.");
        let engine = engine_with(generator);

        let options = RunOptions {
            return_intermediate_steps: true,
            ..RunOptions::default()
        };

        let result = engine
            .run_query(CombineStrategy::MapReduce, &fragments(), "Breyer?", &options)
            .await
            .unwrap();

        let steps = result.intermediate_steps.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].text, "He was thanked.");
        assert_eq!(result.final_answer.text, "The president thanked him.");
    }

    #[tokio::test]
    async fn test_refine_dispatch() {
        let generator = MockGenerator::new()
            .with_response("Context information", "He was thanked.")
            .with_response("More context", "He was thanked; infrastructure too.");
        let engine = engine_with(generator);

        let options = RunOptions {
            return_intermediate_steps: true,
            ..RunOptions::default()
        };

        let result = engine
            .run_query(CombineStrategy::Refine, &fragments(), "Breyer?", &options)
            .await
            .unwrap();

        assert_eq!(result.intermediate_steps.unwrap().len(), 2);
        assert_eq!(result.final_answer.text, "He was thanked; infrastructure too.");
    }

    #[tokio::test]
    async fn test_map_rerank_sources_exclude_no_answer() {
        // Fragment 2 answers "no answer"; only source "1" is attributed
        let generator = MockGenerator::new()
            .with_response("Justice Breyer", "He was thanked.\nScore: 100")
            .with_response("infrastructure", "no answer\nScore: 0");
        let engine = engine_with(generator);

        let options = RunOptions {
            include_sources: true,
            ..RunOptions::default()
        };

        let result = engine
            .run_query(CombineStrategy::MapRerank, &fragments(), "Breyer?", &options)
            .await
            .unwrap();

        assert_eq!(result.sources.unwrap(), BTreeSet::from(["1".to_string()]));
        assert!(result.final_answer.text.ends_with("SOURCES: 1"));
    }

    #[tokio::test]
    async fn test_answer_retrieves_then_runs() {
        let engine = engine_with(MockGenerator::new().with_default_response("He was thanked."));
        let store = StaticStore::new(fragments());

        let result = engine
            .answer(&store, CombineStrategy::Stuff, "Breyer?", &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(result.final_answer.text, "He was thanked.");
    }

    #[tokio::test]
    async fn test_per_run_batch_size_override() {
        let generator = MockGenerator::new().with_default_response("no answer");
        let engine = engine_with(generator.clone()).with_batch_size(4);

        let options = RunOptions {
            batch_size: Some(1),
            return_intermediate_steps: true,
            ..RunOptions::default()
        };

        let result = engine
            .run_query(CombineStrategy::MapReduce, &fragments(), "Breyer?", &options)
            .await
            .unwrap();

        assert_eq!(result.intermediate_steps.unwrap().len(), 2);
        // Two map calls plus one reduce call regardless of batching
        assert_eq!(generator.call_count(), 3);
    }
}
