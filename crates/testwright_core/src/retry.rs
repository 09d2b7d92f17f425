//! Bounded retry around provider → normalize → validate.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{WrightError, WrightResult};
use crate::normalizer::{Extraction, ResponseNormalizer};
use crate::provider::ProviderClient;
use crate::types::{AttemptRecord, Prompt};
use crate::validator::OutputValidator;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Pause after the provider reports a rate limit
    pub rate_limit_delay: Duration,
    /// Accept the first extracted candidate without structural checks
    pub skip_validation: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(5),
            skip_validation: false,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    fn pause_after(&self, error: &WrightError) -> Duration {
        match error {
            WrightError::RateLimited { retry_after, .. } => {
                self.rate_limit_delay.max(retry_after.unwrap_or_default())
            }
            _ => self.delay,
        }
    }
}

/// A candidate that passed, plus the history of how it was reached.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub extraction: Extraction,
    pub attempts: Vec<AttemptRecord>,
}

impl RetryOutcome {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Runs attempts until one yields a valid candidate or the budget is spent.
pub struct RetryController {
    policy: RetryPolicy,
    normalizer: ResponseNormalizer,
    validator: OutputValidator,
}

impl RetryController {
    pub fn new(policy: RetryPolicy, normalizer: ResponseNormalizer, validator: OutputValidator) -> Self {
        Self {
            policy,
            normalizer,
            validator,
        }
    }

    pub async fn run(&self, provider: &dyn ProviderClient, prompt: &Prompt) -> WrightResult<RetryOutcome> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(max_attempts as usize);

        for attempt in 1..=max_attempts {
            let started_at = Utc::now();
            info!(attempt, max_attempts, "Requesting candidate from provider");

            let error = match self.attempt(provider, prompt).await {
                Ok(extraction) => {
                    attempts.push(AttemptRecord {
                        attempt,
                        error: None,
                        started_at,
                    });
                    info!(attempt, method = %extraction.method, "Candidate accepted");
                    return Ok(RetryOutcome {
                        extraction,
                        attempts,
                    });
                }
                Err(e) => e,
            };

            attempts.push(AttemptRecord {
                attempt,
                error: Some(error.to_string()),
                started_at,
            });

            if !error.is_retryable() {
                warn!(attempt, error = %error, "Attempt failed with a non-retryable error");
                return Err(error);
            }

            if attempt == max_attempts {
                warn!(attempt, error = %error, "Attempt failed; retries exhausted");
                return Err(WrightError::GenerationFailed {
                    attempts: attempt,
                    last_reason: error.to_string(),
                });
            }

            let pause = self.policy.pause_after(&error);
            warn!(attempt, error = %error, retry_in = ?pause, "Attempt failed");
            tokio::time::sleep(pause).await;
        }

        // The loop always returns on its last iteration.
        Err(WrightError::GenerationFailed {
            attempts: max_attempts,
            last_reason: "no attempts were made".to_string(),
        })
    }

    async fn attempt(&self, provider: &dyn ProviderClient, prompt: &Prompt) -> WrightResult<Extraction> {
        let reply = provider.invoke(prompt).await?;
        debug!(
            provider = %reply.provider,
            model = %reply.model,
            chars = reply.text.len(),
            input_tokens = ?reply.input_tokens,
            output_tokens = ?reply.output_tokens,
            "Received reply"
        );

        let extraction = self.normalizer.extract(&reply.text);

        if self.policy.skip_validation {
            return Ok(extraction);
        }

        let result = self.validator.check_extraction(&extraction);
        if result.valid {
            Ok(extraction)
        } else {
            Err(WrightError::ValidationFailed {
                reasons: result.reasons,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::SourceAnchors;
    use crate::provider::MockProviderClient;
    use crate::types::{ProviderReply, DEFAULT_LIBRARY};

    const VALID: &str = "```ts\nimport { test, expect } from '@playwright/test';\n\ntest('ok', async ({ page }) => {\n  await expect(page).toHaveTitle(/Dash/);\n});\n```";

    fn controller(policy: RetryPolicy) -> RetryController {
        let anchors = SourceAnchors::new(DEFAULT_LIBRARY).unwrap();
        RetryController::new(
            policy,
            ResponseNormalizer::new(anchors.clone()).unwrap(),
            OutputValidator::new(anchors),
        )
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .delay(Duration::ZERO)
            .rate_limit_delay(Duration::ZERO)
    }

    fn reply(text: &str) -> ProviderReply {
        ProviderReply::new(text, "stub", "stub-model")
    }

    fn prompt() -> Prompt {
        Prompt::new("system", "user")
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let mut provider = MockProviderClient::new();
        let mut calls = 0;
        provider.expect_invoke().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Ok(reply("I think you should change the selector."))
            } else {
                Ok(reply(VALID))
            }
        });

        let outcome = controller(fast_policy()).run(&provider, &prompt()).await.unwrap();

        assert_eq!(outcome.attempt_count(), 3);
        assert!(outcome.extraction.code.contains("test('ok'"));
        assert!(!outcome.attempts[0].succeeded());
        assert!(!outcome.attempts[1].succeeded());
        assert!(outcome.attempts[2].succeeded());
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let mut provider = MockProviderClient::new();
        provider
            .expect_invoke()
            .times(3)
            .returning(|_| Ok(reply("No code here, sorry.")));

        let err = controller(fast_policy()).run(&provider, &prompt()).await.unwrap_err();

        match err {
            WrightError::GenerationFailed {
                attempts,
                last_reason,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_reason.contains("import"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_errors_are_retried() {
        let mut provider = MockProviderClient::new();
        let mut calls = 0;
        provider.expect_invoke().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(WrightError::RateLimited {
                    provider: "stub".into(),
                    retry_after: None,
                })
            } else {
                Ok(reply(VALID))
            }
        });

        let outcome = controller(fast_policy()).run(&provider, &prompt()).await.unwrap();
        assert_eq!(outcome.attempt_count(), 2);
        assert!(outcome.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("Rate limited"));
    }

    #[tokio::test]
    async fn test_auth_failure_stops_immediately() {
        let mut provider = MockProviderClient::new();
        provider.expect_invoke().times(1).returning(|_| {
            Err(WrightError::AuthFailed {
                provider: "stub".into(),
                status: 401,
            })
        });

        let err = controller(fast_policy()).run(&provider, &prompt()).await.unwrap_err();
        assert!(matches!(err, WrightError::AuthFailed { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_skip_validation_accepts_first_reply() {
        let mut provider = MockProviderClient::new();
        provider
            .expect_invoke()
            .times(1)
            .returning(|_| Ok(reply("just prose")));

        let outcome = controller(fast_policy().skip_validation(true))
            .run(&provider, &prompt())
            .await
            .unwrap();
        assert_eq!(outcome.extraction.code, "just prose");
        assert_eq!(outcome.attempt_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_means_one() {
        let mut provider = MockProviderClient::new();
        provider
            .expect_invoke()
            .times(1)
            .returning(|_| Ok(reply("nope")));

        let err = controller(fast_policy().max_attempts(0))
            .run(&provider, &prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, WrightError::GenerationFailed { attempts: 1, .. }));
    }

    #[test]
    fn test_rate_limit_pause_honors_retry_after() {
        let policy = RetryPolicy::default();
        let err = WrightError::RateLimited {
            provider: "stub".into(),
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(policy.pause_after(&err), Duration::from_secs(30));

        let err = WrightError::malformed("stub", "empty");
        assert_eq!(policy.pause_after(&err), Duration::from_secs(1));
    }
}
