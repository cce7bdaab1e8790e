//! Bounded mergeability polling.

use std::time::Duration;

use scm::{MergeStatus, ProviderClient, ScmError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How often and how long to wait for a change request to become mergeable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Maximum number of status queries.
    pub max_attempts: u32,
    /// Delay after the first unresolved query.
    pub delay: Duration,
    pub backoff: Backoff,
}

/// Growth of the delay between queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    Exponential {
        multiplier: f64,
        max_delay: Duration,
    },
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            delay: Duration::from_secs(2),
            backoff: Backoff::Fixed,
        }
    }
}

impl PollPolicy {
    /// Query back to back with no delay.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Number of queries; never zero.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the zero-based `attempt`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exp = i32::try_from(attempt.min(10)).unwrap_or(10);
                let delay_secs = self.delay.as_secs_f64() * multiplier.powi(exp);
                Duration::from_secs_f64(delay_secs.min(max_delay.as_secs_f64()))
            }
        }
    }
}

/// Why polling stopped without a mergeable result.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("change request has merge conflicts (after {attempts} checks)")]
    Conflict { attempts: u32 },

    #[error("change request never became mergeable after {attempts} checks")]
    Timeout { attempts: u32 },

    #[error("mergeability query failed: {0}")]
    Provider(#[from] ScmError),
}

/// Queries a change request until it is mergeable, conflicting, or the
/// attempt budget runs out.
#[derive(Debug, Clone, Default)]
pub struct MergeabilityPoller {
    policy: PollPolicy,
}

impl MergeabilityPoller {
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Poll change request `id` sequentially.
    ///
    /// Returns the number of queries made once the provider reports
    /// [`MergeStatus::Mergeable`].
    ///
    /// # Errors
    ///
    /// [`PollError::Conflict`] as soon as a query reports conflicts,
    /// [`PollError::Timeout`] when every query stays unresolved, and
    /// [`PollError::Provider`] if a query itself fails.
    pub async fn wait_until_mergeable(
        &self,
        client: &dyn ProviderClient,
        id: u64,
    ) -> Result<u32, PollError> {
        let attempts = self.policy.attempts();
        info!(change_request = id, max_attempts = attempts, "Checking mergeability");

        for attempt in 0..attempts {
            let checks = attempt + 1;
            match client.query_mergeability(id).await? {
                MergeStatus::Mergeable => {
                    debug!(change_request = id, checks, "Change request is mergeable");
                    return Ok(checks);
                }
                MergeStatus::Conflicting => {
                    warn!(change_request = id, checks, "Change request has merge conflicts");
                    return Err(PollError::Conflict { attempts: checks });
                }
                status => {
                    debug!(change_request = id, checks, ?status, "Mergeability not resolved yet");
                }
            }

            if checks < attempts {
                tokio::time::sleep(self.policy.delay_for_attempt(attempt)).await;
            }
        }

        warn!(change_request = id, attempts, "Change request never became mergeable");
        Err(PollError::Timeout { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Provider whose n-th query (1-based) returns `statuses[n - 1]`.
    fn scripted(statuses: Vec<MergeStatus>) -> (MockProvider, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut provider = MockProvider::new();
        provider.expect_query_mergeability().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(statuses.get(n).copied().unwrap_or(MergeStatus::Unresolved))
        });
        (provider, calls)
    }

    #[tokio::test]
    async fn test_mergeable_on_third_query() {
        let (provider, calls) = scripted(vec![
            MergeStatus::Unresolved,
            MergeStatus::Unresolved,
            MergeStatus::Mergeable,
        ]);
        let poller = MergeabilityPoller::new(PollPolicy::immediate(7));

        assert_eq!(poller.wait_until_mergeable(&provider, 8).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_stops_immediately() {
        let (provider, calls) = scripted(vec![MergeStatus::Conflicting, MergeStatus::Mergeable]);
        let poller = MergeabilityPoller::new(PollPolicy::immediate(7));

        let err = poller.wait_until_mergeable(&provider, 8).await.unwrap_err();
        assert!(matches!(err, PollError::Conflict { attempts: 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_times_out_after_budget() {
        let (provider, calls) = scripted(vec![]);
        let poller = MergeabilityPoller::new(PollPolicy::immediate(7));

        let err = poller.wait_until_mergeable(&provider, 8).await.unwrap_err();
        assert!(matches!(err, PollError::Timeout { attempts: 7 }));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_merged_status_keeps_polling() {
        let (provider, calls) = scripted(vec![MergeStatus::Merged, MergeStatus::Mergeable]);
        let poller = MergeabilityPoller::new(PollPolicy::immediate(7));

        assert_eq!(poller.wait_until_mergeable(&provider, 8).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_failure_aborts() {
        let mut provider = MockProvider::new();
        provider.expect_query_mergeability().times(1).returning(|_| {
            Err(ScmError::Api {
                provider: scm::Backend::GitLab,
                status: 500,
                body: "boom".to_string(),
            })
        });
        let poller = MergeabilityPoller::new(PollPolicy::immediate(7));

        let err = poller.wait_until_mergeable(&provider, 8).await.unwrap_err();
        assert!(matches!(err, PollError::Provider(_)));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_queries_once() {
        let (provider, calls) = scripted(vec![]);
        let poller = MergeabilityPoller::new(PollPolicy::immediate(0));

        let err = poller.wait_until_mergeable(&provider, 8).await.unwrap_err();
        assert!(matches!(err, PollError::Timeout { attempts: 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_queries_but_not_after_last() {
        let (provider, _) = scripted(vec![]);
        let poller = MergeabilityPoller::new(PollPolicy {
            max_attempts: 7,
            delay: Duration::from_secs(2),
            backoff: Backoff::Fixed,
        });

        let started = tokio::time::Instant::now();
        let _ = poller.wait_until_mergeable(&provider, 8).await;
        // Six gaps between seven queries
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(12), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(13), "{elapsed:?}");
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = PollPolicy {
            max_attempts: 7,
            delay: Duration::from_secs(1),
            backoff: Backoff::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_secs(10),
            },
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(100), Duration::from_secs(10));
    }
}
