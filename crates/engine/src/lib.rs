//! AnswerForge Combination Engine
//!
//! Answers a question from an ordered set of retrieved text fragments using
//! one of four interchangeable strategies:
//! - Stuff: all fragments in one prompt, one generator call
//! - Map-reduce: per-fragment answers combined by a final call
//! - Refine: one sequential refinement pass over the fragments
//! - Map-rerank: per-fragment scored answers, highest score wins
//!
//! Runs are request-scoped and stateless; embedding computation, vector
//! search, and the generation model itself live behind the collaborator
//! interfaces in `answerforge-common`.

pub mod assembler;
pub mod chains;
pub mod engine;
pub mod prompt;
pub mod retriever;

// Re-export commonly used types
pub use assembler::{RunResult, SOURCES_PREFIX};
pub use chains::{Answer, CombineStrategy, PromptRole, RunOptions, NO_ANSWER};
pub use engine::Engine;
pub use prompt::{PromptTemplate, RegexOutputParser};
pub use retriever::{FragmentStore, StaticStore};

pub use answerforge_common::{
    document::SOURCE_KEY, EngineError, Fragment, Generator, Result,
};
