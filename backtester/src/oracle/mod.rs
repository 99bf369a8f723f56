//! Decision oracle: the capability the engine consults at decision points.
//!
//! [`DecisionOracle`] is the seam. [`llm::LlmOracle`] renders a prompt, calls an
//! OpenAI-compatible endpoint through [`client::CompletionClient`] and parses the
//! free-text answer; [`throttle::ThrottledOracle`] spaces calls out; [`HoldOracle`]
//! answers hold without any I/O, for dry runs.
//!
//! An oracle that cannot answer returns `None`. The engine treats that as "no
//! action" for the bar and keeps going.

pub mod client;
pub mod decision;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod throttle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::DecisionContext;

pub use client::{CompletionClient, CompletionSettings, OpenAiClient, OracleError};
pub use decision::{Action, Decision};
pub use llm::LlmOracle;
pub use prompt::PromptRenderer;
pub use throttle::ThrottledOracle;

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, ctx: &DecisionContext<'_>, current_price: f64) -> Option<Decision>;
}

/// Prompt and answer-marker language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en")]
    En,
}

/// Always holds. No network, no cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldOracle;

#[async_trait]
impl DecisionOracle for HoldOracle {
    async fn decide(&self, _ctx: &DecisionContext<'_>, _current_price: f64) -> Option<Decision> {
        Some(Decision::hold("hold oracle"))
    }
}
