//! Map-rerank strategy - independent scored calls, highest score wins
//!
//! Each fragment is answered independently with a prompt that also asks for
//! a 0-100 confidence score. Outputs are parsed into answer/score pairs and
//! collected in fragment supply order; the highest score wins, ties resolve
//! to the earliest fragment. An output that fails to parse keeps its raw
//! text and cannot win; if no output parses at all, the first fragment's
//! raw text is returned flagged as unscored.

use super::{
    is_no_answer, Answer, PromptRole, RunOptions, StrategyOutput, ANSWER_FIELD, SCORE_FIELD,
    UNSCORED_FIELD,
};
use crate::prompt::{default_rerank_parser, vars, PromptTemplate};
use answerforge_common::errors::{EngineError, Result};
use answerforge_common::{Fragment, Generator};

const RERANK_TEMPLATE: &str = "\
Answer the question using the context below. After the answer, give a score \
from 0 to 100 for how fully the answer addresses the question, on its own \
final line in the form:
Score: [score]
If the context is not relevant, answer with: no answer

Context:
{context}

Question: {question}
Answer:";

/// Built-in scored prompt, parsed with the default rerank parser
pub fn default_rerank_prompt() -> PromptTemplate {
    PromptTemplate::new(RERANK_TEMPLATE, &["context", "question"])
        .expect("built-in rerank template is valid")
        .with_output_parser(default_rerank_parser())
}

pub(crate) async fn run(
    generator: &dyn Generator,
    fragments: &[Fragment],
    question: &str,
    options: &RunOptions,
    batch_size: usize,
) -> Result<StrategyOutput> {
    let default_prompt = default_rerank_prompt();
    let template = options
        .prompt_override(PromptRole::Rerank)
        .unwrap_or(&default_prompt);

    let default_parser = default_rerank_parser();
    let parser = template.output_parser().unwrap_or(&default_parser);

    let prompts = fragments
        .iter()
        .map(|f| template.render(&vars(&[("context", f.text.as_str()), ("question", question)])))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        fragment_count = fragments.len(),
        batch_size,
        "Dispatching rerank phase"
    );

    let outputs = super::dispatch_batched(generator, &prompts, batch_size).await?;

    let steps: Vec<Answer> = outputs
        .iter()
        .map(|raw| match parser.parse(raw) {
            Ok(fields) => {
                let text = fields
                    .get(ANSWER_FIELD)
                    .cloned()
                    .unwrap_or_else(|| raw.clone());
                Answer { text, fields }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rerank output did not parse, keeping raw text");
                Answer::text(raw)
            }
        })
        .collect();

    // Highest score wins; strictly-greater keeps the earliest index on ties
    let mut best: Option<(usize, i64)> = None;
    for (index, step) in steps.iter().enumerate() {
        if let Some(score) = step.score() {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((index, score));
            }
        }
    }

    let final_answer = match best {
        Some((index, score)) => {
            tracing::debug!(winner = index, score, "Selected rerank winner");
            steps[index].clone()
        }
        None => {
            tracing::warn!("{}", EngineError::NoValidScore);
            steps[0].clone().with_field(UNSCORED_FIELD, "true")
        }
    };

    let contributing = steps
        .iter()
        .enumerate()
        .filter(|(_, step)| !is_no_answer(&step.text))
        .map(|(i, _)| i)
        .collect();

    Ok(StrategyOutput {
        final_answer,
        steps,
        contributing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use answerforge_common::generator::MockGenerator;

    fn fragments() -> Vec<Fragment> {
        vec![
            Fragment::new("Justice Breyer was thanked for his service."),
            Fragment::new("The speech covered infrastructure."),
            Fragment::new("A section on the economy."),
        ]
    }

    #[tokio::test]
    async fn test_highest_score_wins() {
        let generator = MockGenerator::new()
            .with_response("Justice Breyer", "He was thanked.\nScore: 100")
            .with_response("infrastructure", "no answer\nScore: 0")
            .with_response("economy", "Possibly the economy.\nScore: 40");

        let output = run(&generator, &fragments(), "Breyer?", &RunOptions::default(), 2)
            .await
            .unwrap();

        assert_eq!(output.final_answer.text, "He was thanked.");
        assert_eq!(output.final_answer.score(), Some(100));
        assert_eq!(output.steps.len(), 3);
        assert_eq!(output.steps[2].score(), Some(40));
    }

    #[tokio::test]
    async fn test_tie_resolves_to_earliest_fragment() {
        let generator = MockGenerator::new()
            .with_response("Justice Breyer", "First answer.\nScore: 100")
            .with_response("infrastructure", "Second answer.\nScore: 100")
            .with_response("economy", "no answer\nScore: 0");

        let output = run(&generator, &fragments(), "Breyer?", &RunOptions::default(), 3)
            .await
            .unwrap();

        assert_eq!(output.final_answer.text, "First answer.");
    }

    #[tokio::test]
    async fn test_unparseable_output_keeps_raw_text() {
        let generator = MockGenerator::new()
            .with_response("Justice Breyer", "He was thanked.\nScore: 100")
            .with_response("infrastructure", "rambling output without a score line")
            .with_response("economy", "no answer\nScore: 0");

        let output = run(&generator, &fragments(), "Breyer?", &RunOptions::default(), 3)
            .await
            .unwrap();

        assert_eq!(output.steps[1].text, "rambling output without a score line");
        assert!(output.steps[1].fields.is_empty());
        assert_eq!(output.final_answer.text, "He was thanked.");
    }

    #[tokio::test]
    async fn test_no_valid_score_falls_back_unscored() {
        let generator = MockGenerator::new().with_default_response("no score anywhere");

        let output = run(&generator, &fragments(), "Breyer?", &RunOptions::default(), 2)
            .await
            .unwrap();

        assert_eq!(output.final_answer.text, "no score anywhere");
        assert_eq!(
            output.final_answer.fields.get(UNSCORED_FIELD).map(String::as_str),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_contributing_excludes_no_answer() {
        let generator = MockGenerator::new()
            .with_response("Justice Breyer", "He was thanked.\nScore: 100")
            .with_response("infrastructure", "no answer\nScore: 0")
            .with_response("economy", "no answer\nScore: 0");

        let output = run(&generator, &fragments(), "Breyer?", &RunOptions::default(), 2)
            .await
            .unwrap();

        assert_eq!(output.contributing, vec![0]);
    }
}
