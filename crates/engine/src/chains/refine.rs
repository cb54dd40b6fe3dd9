//! Refine strategy - sequential refinement over the fragments
//!
//! The first fragment seeds an initial answer; every subsequent fragment
//! gets one refine call carrying the accumulated answer. Each step depends
//! on the previous step's output, so the strategy never runs concurrently
//! and costs one generator round trip per fragment.

use super::{Answer, PromptRole, RunOptions, StrategyOutput};
use crate::prompt::{vars, PromptTemplate};
use answerforge_common::errors::{EngineError, Result};
use answerforge_common::{Fragment, Generator};

const INITIAL_TEMPLATE: &str = "\
Context information is below.

{context}

Using only this context, answer the question: {question}
Answer:";

const REFINE_TEMPLATE: &str = "\
The original question is: {question}
An existing answer is below:
{existing_answer}

More context is below.

{context}

If the new context is useful, revise the existing answer with it. Otherwise \
repeat the existing answer.
Revised answer:";

/// Built-in first-fragment prompt
pub fn default_initial_prompt() -> PromptTemplate {
    PromptTemplate::new(INITIAL_TEMPLATE, &["context", "question"])
        .expect("built-in initial template is valid")
}

/// Built-in refinement prompt
pub fn default_refine_prompt() -> PromptTemplate {
    PromptTemplate::new(REFINE_TEMPLATE, &["question", "existing_answer", "context"])
        .expect("built-in refine template is valid")
}

pub(crate) async fn run(
    generator: &dyn Generator,
    fragments: &[Fragment],
    question: &str,
    options: &RunOptions,
) -> Result<StrategyOutput> {
    let Some(first) = fragments.first() else {
        return Err(EngineError::Validation {
            message: "at least one fragment is required".to_string(),
        });
    };

    let default_initial = default_initial_prompt();
    let initial_template = options
        .prompt_override(PromptRole::Initial)
        .unwrap_or(&default_initial);

    let default_refine = default_refine_prompt();
    let refine_template = options
        .prompt_override(PromptRole::Refine)
        .unwrap_or(&default_refine);

    let initial_prompt = initial_template.render(&vars(&[
        ("context", first.text.as_str()),
        ("question", question),
    ]))?;

    let mut current_answer = generator.generate(&initial_prompt).await?;
    let mut steps = vec![Answer::text(current_answer.clone())];

    for (index, fragment) in fragments.iter().enumerate().skip(1) {
        let prompt = refine_template.render(&vars(&[
            ("question", question),
            ("existing_answer", current_answer.as_str()),
            ("context", fragment.text.as_str()),
        ]))?;

        tracing::debug!(step = index, prompt_chars = prompt.len(), "Dispatching refine step");

        current_answer = generator.generate(&prompt).await?;
        steps.push(Answer::text(current_answer.clone()));
    }

    Ok(StrategyOutput {
        final_answer: Answer::text(current_answer),
        steps,
        contributing: (0..fragments.len()).collect(),
    })
}
