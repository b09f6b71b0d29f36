//! RAG (Retrieval-Augmented Generation) for question answering.
//!
//! [`ContextAssembler`] turns retrieved chunks into a text block grouped by
//! video; [`QaAgent`] hands that block to a chat model.

mod answer;
pub mod context;

pub use answer::{sources_from_chunks, AnswerSource, PromptBuilder, QaAgent, QaResponse, NO_ANSWER, NO_VIDEOS};
pub use context::{format_context, AssembledContext, ContextAssembler, NO_RELEVANT_INFORMATION};
