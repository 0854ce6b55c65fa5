use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Transient { retry_after: Option<Duration> },
    Fatal,
}

#[derive(Debug)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8000),
            jitter: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, E, Op, Fut, Classify>(
        &self,
        classify: Classify,
        mut operation: Op,
    ) -> Result<T, RetryFailure<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classify: Fn(&E) -> RetryClass,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let class = classify(&error);
                    match class {
                        RetryClass::Fatal => {
                            return Err(RetryFailure {
                                error,
                                attempts: attempt,
                                exhausted: false,
                            });
                        }
                        RetryClass::Transient { retry_after } => {
                            if attempt == max_attempts {
                                return Err(RetryFailure {
                                    error,
                                    attempts: attempt,
                                    exhausted: true,
                                });
                            }

                            let delay = retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt));
                            let delay = delay + self.sample_jitter();
                            warn!(
                                attempt,
                                max_attempts,
                                delay_ms = delay.as_millis() as u64,
                                "transient failure, backing off: {error}"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base_ms = self.base_delay.as_millis().max(1) as u64;
        let backoff = Duration::from_millis(base_ms.saturating_mul(1u64 << exponent));
        backoff.min(self.max_delay)
    }

    fn sample_jitter(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}
