//! Resumes a pending purchase after the browser comes back from checkout.
//!
//! Expiry is client-side cleanup only: an abandoned record is dropped
//! without telling the server anything.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::domain::purchase::ReportedStatus;

use super::{
    ClientError, LockStates, PaymentStatusClient, PendingPurchase, PendingPurchaseStore,
};

/// Pending records older than this are abandoned.
pub const PENDING_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// Bounded exponential backoff between status requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (1-based): 1s, 2s, 4s, ...
    pub fn delay_before(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Every delay the policy will sleep, in order.
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|r| self.delay_before(r)).collect()
    }
}

/// What `resume` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    NothingPending,
    /// Older than the expiry window; discarded without a request.
    Expired(PendingPurchase),
    /// Server said success; record cleared and movie unlocked.
    Unlocked(PendingPurchase),
    /// Server said failed; record cleared, movie stays locked.
    Failed(PendingPurchase),
    /// Server said refunded; as final as failed, movie stays locked.
    Refunded(PendingPurchase),
    /// Still pending (or unreachable) after every attempt; record kept.
    StillPending(PendingPurchase),
}

pub struct PaymentPoller {
    store: Arc<dyn PendingPurchaseStore>,
    client: Arc<dyn PaymentStatusClient>,
    locks: Arc<LockStates>,
    policy: BackoffPolicy,
    expiry: Duration,
}

impl PaymentPoller {
    pub fn new(
        store: Arc<dyn PendingPurchaseStore>,
        client: Arc<dyn PaymentStatusClient>,
        locks: Arc<LockStates>,
    ) -> Self {
        Self {
            store,
            client,
            locks,
            policy: BackoffPolicy::default(),
            expiry: PENDING_EXPIRY,
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Records a purchase the user is about to leave for.
    pub async fn track(&self, pending: PendingPurchase) -> Result<(), ClientError> {
        self.store.save(&pending).await
    }

    pub async fn resume(&self) -> Result<PollOutcome, ClientError> {
        self.resume_at(Timestamp::now()).await
    }

    /// `resume` with an explicit clock, for tests and replays.
    pub async fn resume_at(&self, now: Timestamp) -> Result<PollOutcome, ClientError> {
        let Some(pending) = self.store.load().await? else {
            return Ok(PollOutcome::NothingPending);
        };

        if self.is_expired(&pending, now) {
            tracing::info!(tx_ref = %pending.tx_ref, "Discarding expired pending purchase");
            self.store.clear().await?;
            return Ok(PollOutcome::Expired(pending));
        }

        match self.poll(&pending).await {
            Some(ReportedStatus::Success) => {
                self.locks.apply(pending.movie_id, ReportedStatus::Success);
                self.store.clear().await?;
                tracing::info!(
                    tx_ref = %pending.tx_ref,
                    movie_id = %pending.movie_id,
                    "Purchase confirmed, movie unlocked"
                );
                Ok(PollOutcome::Unlocked(pending))
            }
            Some(ReportedStatus::Failed) => {
                self.store.clear().await?;
                tracing::info!(tx_ref = %pending.tx_ref, "Purchase failed");
                Ok(PollOutcome::Failed(pending))
            }
            Some(ReportedStatus::Refunded) => {
                self.store.clear().await?;
                tracing::info!(tx_ref = %pending.tx_ref, "Purchase was refunded");
                Ok(PollOutcome::Refunded(pending))
            }
            Some(ReportedStatus::Pending) | None => Ok(PollOutcome::StillPending(pending)),
        }
    }

    fn is_expired(&self, pending: &PendingPurchase, now: Timestamp) -> bool {
        let age = now.duration_since(&pending.started_at);
        age.to_std().map(|age| age > self.expiry).unwrap_or(false)
    }

    /// Up to `max_attempts` requests. Stops early on any final answer;
    /// pending answers and request errors are retried after a backoff.
    async fn poll(&self, pending: &PendingPurchase) -> Option<ReportedStatus> {
        let mut last = None;
        for attempt in 1..=self.policy.max_attempts.max(1) {
            if attempt > 1 {
                tokio::time::sleep(self.policy.delay_before(attempt - 1)).await;
            }

            match self
                .client
                .fetch_status(&pending.movie_id, &pending.tx_ref)
                .await
            {
                Ok(ReportedStatus::Pending) => {
                    tracing::debug!(tx_ref = %pending.tx_ref, attempt, "Purchase not settled yet");
                    last = Some(ReportedStatus::Pending);
                }
                Ok(status) => return Some(status),
                Err(e) => {
                    tracing::warn!(
                        tx_ref = %pending.tx_ref,
                        attempt,
                        error = %e,
                        "Status request failed"
                    );
                }
            }
        }
        last
    }
}
