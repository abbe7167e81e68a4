use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::connection::channel::ChannelEvent;

/// Linear backoff: attempt `n` waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_retries: 3,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Plans attempt number `attempt` (1-based), or `None` once the budget is spent.
    pub fn plan(&self, attempt: u32, ticket: u64) -> Option<ReconnectPlan> {
        (attempt >= 1 && attempt <= self.max_retries).then(|| ReconnectPlan {
            attempt,
            delay: self.delay_for(attempt),
            ticket,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    pub attempt: u32,
    pub delay: Duration,
    /// Echoed back in [`ChannelEvent::ReconnectDue`] so superseded timers can be ignored.
    pub ticket: u64,
}

/// Delivers [`ChannelEvent::ReconnectDue`] once a plan's delay has elapsed.
pub trait ReconnectScheduler: Send + Sync {
    fn schedule(&self, plan: ReconnectPlan);
}

/// Sleeps on the tokio runtime and posts the due event to the manager's inbox.
#[derive(Debug, Clone)]
pub struct TokioReconnectScheduler {
    inbox: UnboundedSender<ChannelEvent>,
}

impl TokioReconnectScheduler {
    pub fn new(inbox: UnboundedSender<ChannelEvent>) -> Self {
        Self { inbox }
    }
}

impl ReconnectScheduler for TokioReconnectScheduler {
    fn schedule(&self, plan: ReconnectPlan) {
        let inbox = self.inbox.clone();
        tracing::debug!(
            attempt = plan.attempt,
            delay_ms = plan.delay.as_millis() as u64,
            "scheduling reconnect"
        );
        tokio::spawn(async move {
            tokio::time::sleep(plan.delay).await;
            if inbox
                .send(ChannelEvent::ReconnectDue {
                    ticket: plan.ticket,
                })
                .is_err()
            {
                tracing::debug!(attempt = plan.attempt, "inbox closed before reconnect fired");
            }
        });
    }
}
