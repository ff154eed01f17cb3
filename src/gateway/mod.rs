//! Provider gateway for Groq chat completions.
//!
//! `ProviderGateway` wraps a `ChatProvider` with the retry policy: one call =
//! one sequential retry loop, exponential backoff with jitter, and the
//! server's Retry-After hint honored when it exceeds the computed backoff.

pub mod error;
pub mod groq;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

use groq::{ChatProvider, GroqAdapter};
use usage::{CallStatus, ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::{ErrorContext, ProviderError};
pub use groq::{GroqConfig, DEFAULT_MODEL};
pub use types::*;
pub use usage::{NoopUsageSink, StderrUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Additional attempts after the first call.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
        }
    }
}

pub struct ProviderGateway<U: UsageSinkTrait> {
    provider: GroqAdapter,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        let provider = GroqAdapter::from_env()?;
        Ok(Self {
            provider,
            usage_sink,
            config: GatewayConfig::default(),
        })
    }

    pub fn with_config(provider: GroqAdapter, usage_sink: Arc<U>, config: GatewayConfig) -> Self {
        Self {
            provider,
            usage_sink,
            config,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        for attempt in 0..=self.config.max_retries {
            let result = self.provider.chat(&req).await;
            match result {
                Ok(resp) => {
                    self.record_usage(&req, &resp, CallStatus::Success, None)
                        .await;
                    return Ok(resp);
                }
                Err(err) => {
                    let code = err.code().to_string();
                    self.record_usage(&req, &ChatResponse::empty(), CallStatus::Error, Some(code))
                        .await;

                    if !err.is_retryable() || attempt == self.config.max_retries {
                        return Err(err);
                    }

                    let mut delay = backoff_delay(&self.config, attempt, &mut rand::thread_rng());
                    if let Some(hint) = err.retry_hint() {
                        if hint > delay {
                            delay = hint;
                        }
                    }
                    debug!(attempt, ?delay, "retrying provider call");
                    sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop always returns")
    }

    async fn record_usage(
        &self,
        req: &ChatRequest,
        resp: &ChatResponse,
        status: CallStatus,
        error_code: Option<String>,
    ) {
        let record = ProviderCallRecord::new(
            req.model.provider(),
            "chat/completions",
            req.model.model_id(),
            req.attribution.caller,
        )
        .tokens(resp.input_tokens as i32, resp.output_tokens as i32)
        .run(req.attribution.run_id)
        .latency(resp.latency.as_millis() as i32);

        let record = if status == CallStatus::Error {
            record.error(error_code.unwrap_or_else(|| "provider_error".to_string()))
        } else {
            record
        };

        self.usage_sink.record(record).await;
    }
}

/// Exponential backoff with jitter.
///
/// Doubles the base per attempt (capped), then scales by a random factor in
/// [0.5, 1.5) so concurrent clients don't retry in lockstep.
fn backoff_delay(config: &GatewayConfig, attempt: u32, rng: &mut impl Rng) -> Duration {
    let multiplier = 2u64.pow(attempt.min(6));
    let delay = config
        .retry_base_delay
        .saturating_mul(multiplier as u32)
        .min(config.retry_max_delay);
    delay.mul_f64(0.5 + rng.gen::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn backoff_grows_and_caps() {
        let config = GatewayConfig {
            max_retries: 5,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(8),
        };
        let mut rng = StdRng::seed_from_u64(7);

        let d0 = backoff_delay(&config, 0, &mut rng);
        assert!(d0 >= Duration::from_millis(500) && d0 < Duration::from_millis(1500));

        let d3 = backoff_delay(&config, 3, &mut rng);
        assert!(d3 <= Duration::from_secs(12)); // 8s cap * 1.5 jitter

        let d10 = backoff_delay(&config, 10, &mut rng);
        assert!(d10 <= Duration::from_secs(12));
    }

    #[test]
    fn backoff_zero_base_stays_zero() {
        let config = GatewayConfig {
            max_retries: 2,
            retry_base_delay: Duration::ZERO,
            retry_max_delay: Duration::from_secs(30),
        };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(backoff_delay(&config, 4, &mut rng), Duration::ZERO);
    }
}
