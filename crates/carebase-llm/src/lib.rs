//! Generative-AI assistant for CareBase.
//!
//! The server talks to a [`CareAssistant`]. [`LlmAssistant`] turns the care
//! tasks into prompts for any [`Completion`] backend and parses the answers;
//! the `remote` feature adds an OpenAI-compatible HTTP backend.
//! [`MockAssistant`] answers deterministically without a model and
//! [`DisabledAssistant`] reports every task as unavailable.

pub mod assistant;
pub mod extraction;
pub mod prompts;
#[cfg(feature = "remote")]
pub mod remote;

pub use assistant::*;
pub use extraction::*;
#[cfg(feature = "remote")]
pub use remote::{HttpAssistant, HttpCompletion, HttpConfig};
