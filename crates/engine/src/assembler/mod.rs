//! Result assembly
//!
//! Packages a strategy's output into the final run record, optionally with
//! per-fragment intermediate steps and a SOURCES suffix derived from
//! fragment metadata.

use crate::chains::{Answer, RunOptions, StrategyOutput};
use answerforge_common::errors::Result;
use answerforge_common::Fragment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Prefix of the source attribution suffix on the final answer text
pub const SOURCES_PREFIX: &str = "SOURCES:";

/// The immutable record of one answering run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Run identifier
    pub run_id: Uuid,

    /// When the run completed
    pub created_at: DateTime<Utc>,

    /// The final answer
    pub final_answer: Answer,

    /// Per-fragment answers in supply order, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_steps: Option<Vec<Answer>>,

    /// Source ids of fragments judged relevant, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeSet<String>>,
}

impl RunResult {
    /// Serialize the run record as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the run record from a strategy's output.
///
/// With `include_sources`, the source ids of contributing fragments are
/// appended to the final answer text as a `SOURCES:` suffix and returned in
/// `sources`. Fragments without a source id contribute no entry.
pub fn assemble(output: StrategyOutput, fragments: &[Fragment], options: &RunOptions) -> RunResult {
    let StrategyOutput {
        mut final_answer,
        steps,
        contributing,
    } = output;

    let sources = if options.include_sources {
        let ids: BTreeSet<String> = contributing
            .iter()
            .filter_map(|&i| fragments.get(i))
            .filter_map(|f| f.source())
            .map(str::to_string)
            .collect();

        if !ids.is_empty() {
            let joined = ids.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            final_answer.text = format!("{}\n{} {}", final_answer.text, SOURCES_PREFIX, joined);
        }

        Some(ids)
    } else {
        None
    };

    RunResult {
        run_id: Uuid::new_v4(),
        created_at: Utc::now(),
        final_answer,
        intermediate_steps: options.return_intermediate_steps.then_some(steps),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> StrategyOutput {
        StrategyOutput {
            final_answer: Answer::text("The president thanked him."),
            steps: vec![
                Answer::text("The president thanked him."),
                Answer::text("no answer"),
            ],
            contributing: vec![0],
        }
    }

    fn fragments() -> Vec<Fragment> {
        vec![
            Fragment::new("A").with_source("1"),
            Fragment::new("B").with_source("2"),
        ]
    }

    #[test]
    fn test_sources_cover_contributing_fragments_only() {
        let options = RunOptions {
            include_sources: true,
            ..RunOptions::default()
        };

        let result = assemble(output(), &fragments(), &options);

        let sources = result.sources.unwrap();
        assert_eq!(sources, BTreeSet::from(["1".to_string()]));
        assert_eq!(
            result.final_answer.text,
            "The president thanked him.\nSOURCES: 1"
        );
    }

    #[test]
    fn test_no_suffix_without_include_sources() {
        let result = assemble(output(), &fragments(), &RunOptions::default());

        assert!(result.sources.is_none());
        assert_eq!(result.final_answer.text, "The president thanked him.");
    }

    #[test]
    fn test_steps_only_when_requested() {
        let options = RunOptions {
            return_intermediate_steps: true,
            ..RunOptions::default()
        };

        let with_steps = assemble(output(), &fragments(), &options);
        assert_eq!(with_steps.intermediate_steps.unwrap().len(), 2);

        let without_steps = assemble(output(), &fragments(), &RunOptions::default());
        assert!(without_steps.intermediate_steps.is_none());
    }

    #[test]
    fn test_fragments_without_source_add_no_suffix() {
        let options = RunOptions {
            include_sources: true,
            ..RunOptions::default()
        };
        let bare = vec![Fragment::new("A"), Fragment::new("B")];

        let result = assemble(output(), &bare, &options);

        assert_eq!(result.sources.unwrap().len(), 0);
        assert_eq!(result.final_answer.text, "The president thanked him.");
    }

    #[test]
    fn test_to_json() {
        let result = assemble(output(), &fragments(), &RunOptions::default());
        let json = result.to_json().unwrap();
        assert!(json.contains("final_answer"));
    }
}
