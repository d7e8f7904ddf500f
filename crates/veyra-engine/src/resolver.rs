//! Prioritized selector resolution.
//!
//! A chain is pure redundancy against DOM drift: candidates are tried strictly in
//! order and the first one reaching its required state wins. A candidate that
//! times out or errors never aborts the rest of the chain.

use crate::backend::{BackendError, Page};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use veyra_common::protocol::{ElementHandle, ResolvedElement, SelectorCandidate, SelectorChain};

/// Default delay between probes while waiting on a single candidate.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

enum WaitError {
    Timeout,
    Backend(BackendError),
}

#[derive(Debug, Clone, Copy)]
pub struct ElementResolver {
    timeout_per_candidate: Duration,
    poll_interval: Duration,
}

impl ElementResolver {
    pub fn new(timeout_per_candidate: Duration) -> Self {
        Self {
            timeout_per_candidate,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn timeout_per_candidate(&self) -> Duration {
        self.timeout_per_candidate
    }

    /// Resolve `chain` against the whole document.
    pub async fn resolve(
        &self,
        page: &mut dyn Page,
        chain: &SelectorChain,
    ) -> Option<ResolvedElement> {
        self.resolve_in(page, None, chain, self.timeout_per_candidate)
            .await
    }

    /// Resolve with a one-off per-candidate timeout.
    pub async fn resolve_with_timeout(
        &self,
        page: &mut dyn Page,
        chain: &SelectorChain,
        timeout: Duration,
    ) -> Option<ResolvedElement> {
        self.resolve_in(page, None, chain, timeout).await
    }

    /// Resolve relative to a container node.
    pub async fn resolve_within(
        &self,
        page: &mut dyn Page,
        scope: &ElementHandle,
        chain: &SelectorChain,
        timeout: Duration,
    ) -> Option<ResolvedElement> {
        self.resolve_in(page, Some(scope), chain, timeout).await
    }

    async fn resolve_in(
        &self,
        page: &mut dyn Page,
        scope: Option<&ElementHandle>,
        chain: &SelectorChain,
        timeout: Duration,
    ) -> Option<ResolvedElement> {
        for (index, candidate) in chain.candidates().iter().enumerate() {
            match self.wait_for(page, scope, candidate, timeout).await {
                Ok(handle) => {
                    debug!(
                        candidate = index + 1,
                        of = chain.len(),
                        "matched `{}`",
                        candidate.matcher
                    );
                    return Some(ResolvedElement {
                        handle,
                        matcher: candidate.matcher.clone(),
                    });
                }
                Err(WaitError::Timeout) => {
                    debug!("`{}` not {:?} in time, trying next", candidate.matcher, candidate.required_state);
                }
                Err(WaitError::Backend(e)) => {
                    warn!("Error checking `{}`: {}", candidate.matcher, e);
                }
            }
        }
        None
    }

    /// Poll one candidate until it reaches its state or `timeout` runs out.
    /// Always probes at least once, so a zero timeout is a single check.
    async fn wait_for(
        &self,
        page: &mut dyn Page,
        scope: Option<&ElementHandle>,
        candidate: &SelectorCandidate,
        timeout: Duration,
    ) -> Result<ElementHandle, WaitError> {
        let deadline = Instant::now() + timeout;
        loop {
            match page
                .query(scope, &candidate.matcher, candidate.required_state)
                .await
            {
                Ok(Some(handle)) => return Ok(handle),
                Ok(None) => {}
                Err(e) if e.is_timeout() => return Err(WaitError::Timeout),
                Err(e) => return Err(WaitError::Backend(e)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
