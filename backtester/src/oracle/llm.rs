use async_trait::async_trait;

use crate::context::DecisionContext;
use crate::oracle::{
    DecisionOracle, client::CompletionClient, decision::Decision, parse::parse_decision,
    prompt::PromptRenderer,
};

/// Prompt, complete, parse. Transport failures are logged and become `None`.
pub struct LlmOracle<C> {
    client: C,
    renderer: PromptRenderer,
}

impl<C: CompletionClient> LlmOracle<C> {
    pub fn new(client: C, renderer: PromptRenderer) -> Self {
        Self { client, renderer }
    }
}

#[async_trait]
impl<C: CompletionClient> DecisionOracle for LlmOracle<C> {
    async fn decide(&self, ctx: &DecisionContext<'_>, _current_price: f64) -> Option<Decision> {
        let prompt = self.renderer.render(ctx);
        match self.client.complete(&prompt).await {
            Ok(text) => {
                let decision = parse_decision(&text, ctx.mode, self.renderer.language());
                tracing::debug!(ts = %ctx.timestamp, action = ?decision.action, "oracle answered");
                Some(decision)
            }
            Err(e) => {
                tracing::warn!(
                    ts = %ctx.timestamp,
                    error = %e,
                    "oracle call failed; no decision for this bar"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecisionMode;
    use crate::oracle::{Language, OracleError, decision::Action};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    struct Canned {
        answer: Result<&'static str, ()>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.map(str::to_string).map_err(|_| OracleError::Empty)
        }
    }

    fn ctx(mode: DecisionMode) -> DecisionContext<'static> {
        DecisionContext {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap(),
            current_price: 42000.0,
            mode,
            slices: vec![],
        }
    }

    #[tokio::test]
    async fn answer_is_parsed_in_context_mode() {
        let oracle = LlmOracle::new(
            Canned {
                answer: Ok("今日大方向：偏空\n關鍵壓力：43500"),
                prompts: Mutex::new(vec![]),
            },
            PromptRenderer::new(Language::ZhTw, "BTCUSDT", "Asia/Taipei 06:00-21:00"),
        );
        let d = oracle.decide(&ctx(DecisionMode::SessionPlan), 42000.0).await.unwrap();
        assert_eq!(d.action, Action::Short);
        assert_eq!(d.resistance, Some(43500.0));
        assert!(oracle.client.prompts.lock().unwrap()[0].contains("【當前價格】:42000"));
    }

    #[tokio::test]
    async fn client_failure_is_no_decision() {
        let oracle = LlmOracle::new(
            Canned {
                answer: Err(()),
                prompts: Mutex::new(vec![]),
            },
            PromptRenderer::new(Language::En, "BTCUSDT", "UTC 00:00-00:00"),
        );
        assert!(oracle.decide(&ctx(DecisionMode::PerBar), 42000.0).await.is_none());
    }
}
