//! Act-then-confirm protocol for state-changing UI actions.

use crate::backend::{BackendError, Page};
use crate::resolver::ElementResolver;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use veyra_common::protocol::{Matcher, ResolvedElement, SelectorChain};

/// Result of one protocol run. Every call produces one; callers must look at it.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// No candidate in the target chain resolved; nothing was attempted.
    NotFound,
    /// The action ran (or tried to) but the confirm check never passed.
    AttemptedUnconfirmed {
        via: Matcher,
        error: Option<String>,
    },
    /// The target state was observed. For pre-checked actions `via` is the
    /// matcher that showed the state was already reached.
    Confirmed { via: Matcher },
}

impl ActionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ActionOutcome::Confirmed { .. })
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::NotFound => write!(f, "not found"),
            ActionOutcome::AttemptedUnconfirmed { via, error: None } => {
                write!(f, "attempted via `{}`, unconfirmed", via)
            }
            ActionOutcome::AttemptedUnconfirmed {
                via,
                error: Some(e),
            } => write!(f, "attempted via `{}`, failed: {}", via, e),
            ActionOutcome::Confirmed { via } => write!(f, "confirmed via `{}`", via),
        }
    }
}

/// The state-changing step of an action.
#[async_trait]
pub trait Act: Send + Sync {
    async fn act(&self, page: &mut dyn Page, target: &ResolvedElement)
    -> Result<(), BackendError>;
}

/// Post-action check that the intended transition took effect.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirmed(&self, page: &mut dyn Page) -> Result<bool, BackendError>;
}

pub struct Click;

#[async_trait]
impl Act for Click {
    async fn act(
        &self,
        page: &mut dyn Page,
        target: &ResolvedElement,
    ) -> Result<(), BackendError> {
        page.click(&target.handle).await
    }
}

/// Focus a text box, clear it, type `text`, then submit.
///
/// Submission clicks the first resolving candidate of `submit`; when none
/// resolves (or no chain is given) it falls back to pressing Enter.
pub struct Compose<'a> {
    pub text: &'a str,
    pub submit: Option<&'a SelectorChain>,
    pub resolver: ElementResolver,
    pub key_delay: Duration,
    pub settle: Duration,
}

#[async_trait]
impl Act for Compose<'_> {
    async fn act(
        &self,
        page: &mut dyn Page,
        target: &ResolvedElement,
    ) -> Result<(), BackendError> {
        page.click(&target.handle).await?;
        tokio::time::sleep(self.settle).await;
        page.fill(&target.handle, "").await?;
        page.type_text(self.text, self.key_delay).await?;

        let button = match self.submit {
            Some(chain) => self.resolver.resolve(page, chain).await,
            None => None,
        };
        match button {
            Some(button) => {
                info!("Submitting via `{}`", button.matcher);
                page.click(&button.handle).await
            }
            None => {
                info!("No explicit submit button found, pressing Enter");
                page.press_key("Enter").await
            }
        }
    }
}

/// Confirmed when any candidate of the chain is present.
pub struct AnyVisible<'a>(pub &'a SelectorChain);

#[async_trait]
impl Confirm for AnyVisible<'_> {
    async fn confirmed(&self, page: &mut dyn Page) -> Result<bool, BackendError> {
        for candidate in self.0.candidates() {
            if page
                .query(None, &candidate.matcher, candidate.required_state)
                .await?
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Confirmed once no candidate of the chain is present any more.
pub struct Gone<'a>(pub &'a SelectorChain);

#[async_trait]
impl Confirm for Gone<'_> {
    async fn confirmed(&self, page: &mut dyn Page) -> Result<bool, BackendError> {
        Ok(!AnyVisible(self.0).confirmed(page).await?)
    }
}

/// Confirmed once the document shows more copies of `text` than it did when
/// the snapshot was taken. Take the snapshot before acting.
pub struct TextVisible<'a> {
    text: &'a str,
    baseline: usize,
}

impl<'a> TextVisible<'a> {
    pub async fn snapshot(page: &mut dyn Page, text: &'a str) -> Self {
        let baseline = match page.count_text(text).await {
            Ok(count) => count,
            Err(e) => {
                debug!("Could not count existing copies of the text: {}", e);
                0
            }
        };
        Self { text, baseline }
    }

    pub fn baseline(&self) -> usize {
        self.baseline
    }
}

#[async_trait]
impl Confirm for TextVisible<'_> {
    async fn confirmed(&self, page: &mut dyn Page) -> Result<bool, BackendError> {
        Ok(page.count_text(self.text).await? > self.baseline)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActionProtocol {
    resolver: ElementResolver,
    confirm_timeout: Duration,
    precheck_timeout: Duration,
    poll_interval: Duration,
}

impl ActionProtocol {
    pub fn new(resolver: ElementResolver, confirm_timeout: Duration) -> Self {
        Self {
            resolver,
            confirm_timeout,
            precheck_timeout: resolver.timeout_per_candidate(),
            poll_interval: Duration::from_millis(250),
        }
    }

    pub fn with_precheck_timeout(mut self, timeout: Duration) -> Self {
        self.precheck_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn resolver(&self) -> ElementResolver {
        self.resolver
    }

    /// Resolve, act, confirm. Never returns an error: every failure degrades to
    /// an outcome.
    pub async fn perform(
        &self,
        page: &mut dyn Page,
        name: &str,
        target: &SelectorChain,
        act: &dyn Act,
        confirm: &dyn Confirm,
    ) -> ActionOutcome {
        let Some(element) = self.resolver.resolve(page, target).await else {
            warn!("{}: no candidate resolved ({} tried)", name, target.len());
            return ActionOutcome::NotFound;
        };
        info!("{}: acting via `{}`", name, element.matcher);

        let mut error = None;
        if let Err(e) = act.act(page, &element).await {
            warn!("{}: action via `{}` failed: {}", name, element.matcher, e);
            error = Some(e.to_string());
        }

        if self.poll_confirm(page, name, confirm).await {
            info!("{}: confirmed (worked via `{}`)", name, element.matcher);
            ActionOutcome::Confirmed {
                via: element.matcher,
            }
        } else {
            warn!(
                "{}: could not confirm after {:?} (acted via `{}`)",
                name, self.confirm_timeout, element.matcher
            );
            ActionOutcome::AttemptedUnconfirmed {
                via: element.matcher,
                error,
            }
        }
    }

    /// Like `perform`, but first checks whether the target state is already
    /// showing. Toggle-style actions (like/unlike) would undo themselves on a
    /// second click, so a positive pre-check skips the action entirely.
    pub async fn perform_once(
        &self,
        page: &mut dyn Page,
        name: &str,
        already: &SelectorChain,
        target: &SelectorChain,
        act: &dyn Act,
        confirm: &dyn Confirm,
    ) -> ActionOutcome {
        if let Some(state) = self
            .resolver
            .resolve_with_timeout(page, already, self.precheck_timeout)
            .await
        {
            info!("{}: already done (detected via `{}`)", name, state.matcher);
            return ActionOutcome::Confirmed { via: state.matcher };
        }
        self.perform(page, name, target, act, confirm).await
    }

    async fn poll_confirm(&self, page: &mut dyn Page, name: &str, confirm: &dyn Confirm) -> bool {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            match confirm.confirmed(page).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("{}: confirm check errored: {}", name, e),
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
