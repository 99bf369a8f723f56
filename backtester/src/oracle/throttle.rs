use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::context::DecisionContext;
use crate::oracle::{DecisionOracle, decision::Decision};

/// Spaces calls to the inner oracle at least `min_interval` apart.
///
/// The first call goes through immediately; later calls wait for the limiter.
/// Waiting never retries anything.
pub struct ThrottledOracle<O> {
    inner: O,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl<O> ThrottledOracle<O> {
    /// A zero interval disables throttling.
    pub fn new(inner: O, min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval).map(RateLimiter::direct);
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: DecisionOracle> DecisionOracle for ThrottledOracle<O> {
    async fn decide(&self, ctx: &DecisionContext<'_>, current_price: f64) -> Option<Decision> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        self.inner.decide(ctx, current_price).await
    }
}
