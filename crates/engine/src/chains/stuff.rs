//! Stuff strategy - single-call combination
//!
//! Concatenates every fragment text into one context block and answers with
//! a single generator call. The rendered prompt is checked against the
//! generator's input budget before the call; an oversized context surfaces
//! as ContextOverflow, never as silent truncation.

use super::{Answer, PromptRole, RunOptions, StrategyOutput};
use crate::prompt::{vars, PromptTemplate};
use answerforge_common::errors::{EngineError, Result};
use answerforge_common::{Fragment, Generator};

/// Separator between fragment texts in the context block
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

const STUFF_TEMPLATE: &str = "\
Answer the question using only the context below. If the context does not \
contain the answer, say that you don't know instead of guessing.

Context:
{context}

Question: {question}
Answer:";

/// Built-in prompt for the stuff strategy
pub fn default_stuff_prompt() -> PromptTemplate {
    PromptTemplate::new(STUFF_TEMPLATE, &["context", "question"])
        .expect("built-in stuff template is valid")
}

pub(crate) async fn run(
    generator: &dyn Generator,
    fragments: &[Fragment],
    question: &str,
    options: &RunOptions,
) -> Result<StrategyOutput> {
    let default_prompt = default_stuff_prompt();
    let template = options
        .prompt_override(PromptRole::Stuff)
        .unwrap_or(&default_prompt);

    let context = fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR);

    let prompt = template.render(&vars(&[("context", context.as_str()), ("question", question)]))?;

    let budget = generator.max_input_chars();
    if prompt.len() > budget {
        return Err(EngineError::ContextOverflow {
            length: prompt.len(),
            budget,
        });
    }

    tracing::debug!(
        fragment_count = fragments.len(),
        prompt_chars = prompt.len(),
        budget,
        "Dispatching stuff prompt"
    );

    let output = generator.generate(&prompt).await?;

    Ok(StrategyOutput {
        final_answer: Answer::text(output),
        steps: Vec::new(),
        contributing: (0..fragments.len()).collect(),
    })
}
