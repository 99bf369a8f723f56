//! Replays multi-timeframe price history against a decision oracle and
//! simulates the resulting single-position account.
//!
//! Flow per primary bar: [`session`] filter, [`context`] assembly, [`oracle`]
//! decision, [`strategy`] intent, [`account`] transition, equity sample. The
//! [`engine`] drives the loop, [`performance`] scores the equity curve and
//! [`report`] streams the run's output files.

pub mod account;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod oracle;
pub mod performance;
pub mod report;
pub mod session;
pub mod store;
pub mod strategy;
pub mod tz;

pub use config::{RunConfig, load_config_path, load_config_str};
pub use engine::{BacktestOutcome, Backtester, RunStats};
pub use errors::BacktestError;

use oracle::{LlmOracle, OpenAiClient, PromptRenderer, ThrottledOracle};

/// The production oracle for `config`: OpenAI-compatible client, prompt in the
/// configured language, calls spaced by `min_interval_secs`.
pub fn build_llm_oracle(
    config: &RunConfig,
) -> Result<ThrottledOracle<LlmOracle<OpenAiClient>>, BacktestError> {
    let o = &config.oracle;
    let client = OpenAiClient::from_env(&o.base_url, &o.api_key_env, o.completion_settings())?;
    let session = config.session_window()?.describe();
    let renderer = PromptRenderer::new(o.language, &config.symbol, session);
    Ok(ThrottledOracle::new(LlmOracle::new(client, renderer), o.min_interval()))
}
