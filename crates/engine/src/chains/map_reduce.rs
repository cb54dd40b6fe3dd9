//! Map-reduce strategy - independent map calls, one combining call
//!
//! Map phase: each fragment is answered independently; calls are dispatched
//! in batches of the configured size, and outputs keep fragment supply order
//! regardless of completion order. Reduce phase: the per-fragment answers
//! are joined into a summaries block and combined with one final call.
//!
//! A failed map call fails the whole run; a partial answer is never
//! presented as complete.

use super::{is_no_answer, Answer, PromptRole, RunOptions, StrategyOutput};
use crate::prompt::{vars, PromptTemplate};
use answerforge_common::errors::Result;
use answerforge_common::{Fragment, Generator};

const QUESTION_TEMPLATE: &str = "\
The following is a portion of a long document.

{context}

Return any text from the portion that helps answer the question below. If \
none of it is relevant, reply with: no answer
Question: {question}
Relevant text:";

const COMBINE_TEMPLATE: &str = "\
Below are extracted portions of a long document, followed by a question. \
Write a final answer from the portions. If they do not contain the answer, \
say that you don't know instead of guessing.

{summaries}

Question: {question}
Final answer:";

/// Built-in map-phase prompt
pub fn default_question_prompt() -> PromptTemplate {
    PromptTemplate::new(QUESTION_TEMPLATE, &["context", "question"])
        .expect("built-in question template is valid")
}

/// Built-in reduce-phase prompt
pub fn default_combine_prompt() -> PromptTemplate {
    PromptTemplate::new(COMBINE_TEMPLATE, &["summaries", "question"])
        .expect("built-in combine template is valid")
}

pub(crate) async fn run(
    generator: &dyn Generator,
    fragments: &[Fragment],
    question: &str,
    options: &RunOptions,
    batch_size: usize,
) -> Result<StrategyOutput> {
    let default_question = default_question_prompt();
    let question_template = options
        .prompt_override(PromptRole::Question)
        .unwrap_or(&default_question);

    let default_combine = default_combine_prompt();
    let combine_template = options
        .prompt_override(PromptRole::Combine)
        .unwrap_or(&default_combine);

    let prompts = fragments
        .iter()
        .map(|f| question_template.render(&vars(&[("context", f.text.as_str()), ("question", question)])))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        fragment_count = fragments.len(),
        batch_size,
        "Dispatching map phase"
    );

    let map_outputs = super::dispatch_batched(generator, &prompts, batch_size).await?;

    let steps: Vec<Answer> = map_outputs.iter().map(Answer::text).collect();
    let contributing = steps
        .iter()
        .enumerate()
        .filter(|(_, step)| !is_no_answer(&step.text))
        .map(|(i, _)| i)
        .collect();

    let summaries = map_outputs.join("\n\n");
    let reduce_prompt =
        combine_template.render(&vars(&[("summaries", summaries.as_str()), ("question", question)]))?;

    tracing::debug!(summary_chars = summaries.len(), "Dispatching reduce phase");

    let final_text = generator.generate(&reduce_prompt).await?;

    Ok(StrategyOutput {
        final_answer: Answer::text(final_text),
        steps,
        contributing,
    })
}
