//! Rewrite - guarded AI rewriting of paragraphs
//!
//! A rewrite runs in three steps. [`RewriteEngine::prepare`] resolves the
//! scope and captures each block's `localVersion`;
//! [`RewriteEngine::request`] sends batches to a [`CompletionService`];
//! [`RewriteEngine::validate`] checks the answers against the live model,
//! which may have changed in the meantime.

mod engine;
mod error;
pub mod guardrails;
#[cfg(feature = "openai")]
pub mod openai;
pub mod scope;
pub mod service;

pub use engine::*;
pub use error::*;
pub use guardrails::{GuardrailConfig, RejectionReason, SkipReason};
pub use scope::RewriteScope;
pub use service::{CompletionRequest, CompletionService, ScriptedCompletionService};
