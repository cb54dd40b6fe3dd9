//! Combination strategies
//!
//! Four interchangeable algorithms that turn retrieved fragments plus a
//! question into an answer:
//! - Stuff: one prompt holding every fragment, one generator call
//! - Map-reduce: independent per-fragment calls, then one combining call
//! - Refine: sequential refinement carrying an accumulated answer
//! - Map-rerank: independent scored calls, highest score wins
//!
//! Every supplied fragment is represented in the outcome: consumed into an
//! answer attempt, or explicitly scored/marked "no answer".

mod stuff;
mod map_reduce;
mod refine;
mod map_rerank;

pub use stuff::{default_stuff_prompt, FRAGMENT_SEPARATOR};
pub use map_reduce::{default_combine_prompt, default_question_prompt};
pub use refine::{default_initial_prompt, default_refine_prompt};
pub use map_rerank::default_rerank_prompt;

use crate::prompt::PromptTemplate;
use answerforge_common::errors::Result;
use answerforge_common::{Fragment, Generator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel a map-phase answer uses to mark an irrelevant fragment
pub const NO_ANSWER: &str = "no answer";

/// Field holding a parsed answer text
pub const ANSWER_FIELD: &str = "answer";

/// Field holding a parsed confidence score
pub const SCORE_FIELD: &str = "score";

/// Field marking a fallback answer no fragment scored
pub const UNSCORED_FIELD: &str = "unscored";

pub(crate) fn is_no_answer(text: &str) -> bool {
    text.trim()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(NO_ANSWER)
}

/// A generated answer with optional structured fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// Answer text
    pub text: String,

    /// Structured fields populated by an output parser (e.g. answer, score)
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl Answer {
    /// Create an answer carrying only text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: HashMap::new(),
        }
    }

    /// Attach a structured field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The parsed confidence score, if present and numeric
    pub fn score(&self) -> Option<i64> {
        self.fields.get(SCORE_FIELD).and_then(|s| s.trim().parse().ok())
    }
}

/// A strategy's raw output, before result assembly
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    /// The final answer
    pub final_answer: Answer,

    /// Per-fragment answers in fragment supply order; empty for stuff
    pub steps: Vec<Answer>,

    /// Indices of fragments judged relevant, for source attribution
    pub contributing: Vec<usize>,
}

/// Prompt roles a caller can override per run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    /// Stuff: the single combined prompt
    Stuff,
    /// Map-reduce: the per-fragment map prompt
    Question,
    /// Map-reduce: the final combining prompt
    Combine,
    /// Refine: the first-fragment prompt
    Initial,
    /// Refine: the per-fragment refinement prompt
    Refine,
    /// Map-rerank: the per-fragment scored prompt
    Rerank,
}

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Return per-fragment intermediate answers in the result
    pub return_intermediate_steps: bool,

    /// Append a SOURCES suffix derived from fragment metadata
    pub include_sources: bool,

    /// Map-phase batch size; None uses the engine default
    pub batch_size: Option<usize>,

    /// Prompt overrides by role; built-in templates are used otherwise
    pub prompts: HashMap<PromptRole, PromptTemplate>,
}

impl RunOptions {
    /// The caller's template override for a role, if any
    pub fn prompt_override(&self, role: PromptRole) -> Option<&PromptTemplate> {
        self.prompts.get(&role)
    }
}

/// The four combination strategies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombineStrategy {
    /// All fragments in one prompt
    Stuff,
    /// Independent map calls, one reduce call
    MapReduce,
    /// Sequential refinement
    Refine,
    /// Independent scored calls, best score wins
    MapRerank,
}

impl CombineStrategy {
    /// Strategy tag used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            CombineStrategy::Stuff => "stuff",
            CombineStrategy::MapReduce => "map_reduce",
            CombineStrategy::Refine => "refine",
            CombineStrategy::MapRerank => "map_rerank",
        }
    }

    /// Run this strategy over the supplied fragments.
    ///
    /// `batch_size` bounds concurrent map-phase calls for the two parallel
    /// strategies; stuff and refine ignore it.
    pub async fn combine(
        &self,
        generator: &dyn Generator,
        fragments: &[Fragment],
        question: &str,
        options: &RunOptions,
        batch_size: usize,
    ) -> Result<StrategyOutput> {
        match self {
            CombineStrategy::Stuff => stuff::run(generator, fragments, question, options).await,
            CombineStrategy::MapReduce => {
                map_reduce::run(generator, fragments, question, options, batch_size).await
            }
            CombineStrategy::Refine => refine::run(generator, fragments, question, options).await,
            CombineStrategy::MapRerank => {
                map_rerank::run(generator, fragments, question, options, batch_size).await
            }
        }
    }
}

impl fmt::Display for CombineStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombineStrategy {
    type Err = answerforge_common::EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stuff" => Ok(CombineStrategy::Stuff),
            "map_reduce" => Ok(CombineStrategy::MapReduce),
            "refine" => Ok(CombineStrategy::Refine),
            "map_rerank" => Ok(CombineStrategy::MapRerank),
            other => Err(answerforge_common::EngineError::Validation {
                message: format!("unknown combination strategy '{}'", other),
            }),
        }
    }
}

/// Dispatch map-phase prompts in batches of `batch_size`, preserving prompt
/// order in the outputs. Batch size bounds concurrent load on the generator;
/// it never changes the logical result.
pub(crate) async fn dispatch_batched(
    generator: &dyn Generator,
    prompts: &[String],
    batch_size: usize,
) -> Result<Vec<String>> {
    let batch_size = batch_size.max(1);
    let mut outputs = Vec::with_capacity(prompts.len());

    for batch in prompts.chunks(batch_size) {
        let mut results = generator.generate_batch(batch).await?;
        outputs.append(&mut results);
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use answerforge_common::generator::MockGenerator;

    #[test]
    fn test_strategy_tags() {
        assert_eq!(CombineStrategy::MapReduce.as_str(), "map_reduce");
        assert_eq!(
            "map_rerank".parse::<CombineStrategy>().unwrap(),
            CombineStrategy::MapRerank
        );
        assert!("reduce_map".parse::<CombineStrategy>().is_err());
    }

    #[test]
    fn test_no_answer_sentinel() {
        assert!(is_no_answer("no answer"));
        assert!(is_no_answer(" No answer. "));
        assert!(!is_no_answer("no answer found in the text"));
    }

    #[test]
    fn test_answer_score() {
        let answer = Answer::text("ok").with_field(SCORE_FIELD, "87");
        assert_eq!(answer.score(), Some(87));

        let answer = Answer::text("ok").with_field(SCORE_FIELD, "high");
        assert_eq!(answer.score(), None);
    }

    #[tokio::test]
    async fn test_dispatch_batched_order() {
        let generator = MockGenerator::new()
            .with_response("alpha", "1")
            .with_response("beta", "2")
            .with_response("gamma", "3");

        let prompts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];

        for batch_size in [1, 2, 5] {
            let outputs = dispatch_batched(&generator, &prompts, batch_size)
                .await
                .unwrap();
            assert_eq!(outputs, vec!["1", "2", "3"]);
        }
    }
}
