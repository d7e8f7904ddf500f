//! Session-readiness gate.
//!
//! `Unauthenticated -> Authenticated` is the only transition. The loop has no
//! timeout of its own: first runs need a human to log in. Each cycle is bounded,
//! and the cancellation token is observed between cycles and during the wait.

use crate::backend::Page;
use crate::config::AgentConfig;
use crate::diagnostics::{self, Diagnostics};
use crate::platform::PlatformProfile;
use crate::resolver::ElementResolver;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use veyra_common::protocol::Matcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvidence {
    Cookie(String),
    Landmark(Matcher),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Authenticated(SessionEvidence),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Authenticated(SessionEvidence),
    Cancelled,
}

pub struct LoginGate {
    profile: PlatformProfile,
    resolver: ElementResolver,
    navigation_timeout: Duration,
    settle: Duration,
    poll_interval: Duration,
    diagnostics: Diagnostics,
}

impl LoginGate {
    pub fn new(profile: &PlatformProfile, config: &AgentConfig, diagnostics: Diagnostics) -> Self {
        Self {
            profile: profile.clone(),
            resolver: ElementResolver::new(config.timeouts.landmark()),
            navigation_timeout: config.timeouts.navigation(),
            settle: config.timeouts.page_settle(),
            poll_interval: config.timeouts.login_poll(),
            diagnostics,
        }
    }

    /// Block until the session is authenticated or `cancel` fires.
    pub async fn wait(&self, page: &mut dyn Page, cancel: &CancellationToken) -> GateOutcome {
        info!("Checking if we're logged in...");
        loop {
            if cancel.is_cancelled() {
                info!("Login wait cancelled");
                return GateOutcome::Cancelled;
            }

            let state = tokio::select! {
                state = self.poll_once(page) => state,
                _ = cancel.cancelled() => {
                    info!("Login wait cancelled");
                    return GateOutcome::Cancelled;
                }
            };
            if let GateState::Authenticated(evidence) = state {
                return GateOutcome::Authenticated(evidence);
            }

            info!("Still waiting for manual login... (browser open)");
            self.diagnostics
                .capture(page, diagnostics::LOGIN_WAIT)
                .await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {
                    info!("Login wait cancelled");
                    return GateOutcome::Cancelled;
                }
            }
        }
    }

    /// One poll cycle: load the home page and look for session evidence.
    pub async fn poll_once(&self, page: &mut dyn Page) -> GateState {
        if let Err(e) = page.goto(&self.profile.home_url, self.navigation_timeout).await {
            if e.is_timeout() {
                warn!("Page navigation timed out during login check. Retrying...");
            } else {
                warn!("Navigation error during login check: {}", e);
            }
        }
        tokio::time::sleep(self.settle).await;

        match page.cookies().await {
            Ok(cookies) => {
                if cookies.iter().any(|c| c.name == self.profile.session_cookie) {
                    info!("Found session cookie `{}`", self.profile.session_cookie);
                    return GateState::Authenticated(SessionEvidence::Cookie(
                        self.profile.session_cookie.clone(),
                    ));
                }
            }
            Err(e) => debug!("Could not read cookies: {}", e),
        }

        if let Some(landmark) = self.resolver.resolve(page, &self.profile.landmarks).await {
            info!("Detected logged-in session via `{}`", landmark.matcher);
            return GateState::Authenticated(SessionEvidence::Landmark(landmark.matcher));
        }

        match page.current_url().await {
            Ok(url) if self.profile.is_login_redirect(&url) => {
                warn!("Redirected to login/checkpoint page ({}). Manual login required.", url);
            }
            Ok(_) => {}
            Err(e) => debug!("Could not read current URL: {}", e),
        }

        GateState::Unauthenticated
    }
}
