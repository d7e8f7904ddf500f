use crate::action::{ActionOutcome, ActionProtocol, AnyVisible, Click, Compose, TextVisible};
use crate::backend::Page;
use crate::config::{AgentConfig, CommentSource};
use crate::diagnostics::{self, Diagnostics};
use crate::error::EngineError;
use crate::generator::{CommentPool, GenerationContext, GenerationKind, SafeGenerator};
use crate::login::{GateOutcome, LoginGate};
use crate::pacing;
use crate::platform::PlatformProfile;
use crate::resolver::ElementResolver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PostReport {
    pub url: String,
    pub like: ActionOutcome,
    pub comment: ActionOutcome,
    pub comment_text: String,
}

/// Login gate, navigate, pause, like, comment. Like and comment fail
/// independently; only a bad landing page aborts the run.
pub struct PostInteractionWorkflow {
    profile: PlatformProfile,
    config: AgentConfig,
    gate: LoginGate,
    protocol: ActionProtocol,
    generator: SafeGenerator,
    diagnostics: Diagnostics,
}

impl PostInteractionWorkflow {
    pub fn new(
        profile: PlatformProfile,
        config: AgentConfig,
        generator: SafeGenerator,
        diagnostics: Diagnostics,
    ) -> Self {
        let gate = LoginGate::new(&profile, &config, diagnostics.clone());
        let protocol = ActionProtocol::new(
            ElementResolver::new(config.timeouts.candidate()),
            config.timeouts.confirm(),
        )
        .with_precheck_timeout(config.timeouts.precheck());
        Self {
            profile,
            config,
            gate,
            protocol,
            generator,
            diagnostics,
        }
    }

    pub async fn run(
        &self,
        page: &mut dyn Page,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PostReport, EngineError> {
        info!("Launching automation for {} on {}", self.config.agent_name, self.profile.platform);
        if let GateOutcome::Cancelled = self.gate.wait(page, cancel).await {
            return Err(EngineError::Cancelled);
        }

        self.open_post(page, url).await?;
        pacing::pause(self.config.min_delay_sec, self.config.max_delay_sec).await;

        let like = self.like(page).await;
        let (comment_text, comment) = self.comment(page).await;

        Ok(PostReport {
            url: url.to_string(),
            like,
            comment,
            comment_text,
        })
    }

    /// Navigate and verify the landing URL. Both failures are fatal for the run.
    async fn open_post(&self, page: &mut dyn Page, url: &str) -> Result<(), EngineError> {
        info!("Navigating to post: {}", url);
        page.goto(url, self.config.timeouts.navigation())
            .await
            .map_err(|e| EngineError::from_navigation(url, e))?;
        tokio::time::sleep(self.config.timeouts.page_settle()).await;

        let landed = page.current_url().await?;
        if !self.profile.is_within_origin(&landed) {
            warn!("Unexpected redirect. Still on: {}", landed);
            self.diagnostics
                .capture(page, diagnostics::REDIRECT_ERROR)
                .await;
            return Err(EngineError::StructuralMismatch {
                expected: self.profile.origin.clone(),
                actual: landed,
            });
        }
        info!("On post URL: {}", landed);
        Ok(())
    }

    async fn like(&self, page: &mut dyn Page) -> ActionOutcome {
        let selectors = &self.profile.post;
        let outcome = self
            .protocol
            .perform_once(
                page,
                "like",
                &selectors.liked,
                &selectors.like_button,
                &Click,
                &AnyVisible(&selectors.liked),
            )
            .await;
        if !outcome.is_confirmed() {
            warn!("Like not confirmed: {}", outcome);
            self.diagnostics.capture(page, diagnostics::LIKE_FAIL).await;
        }
        outcome
    }

    async fn comment(&self, page: &mut dyn Page) -> (String, ActionOutcome) {
        let text = self.comment_text(page).await;
        info!("Preparing to comment: {}", text);

        let selectors = &self.profile.post;
        let compose = Compose {
            text: &text,
            submit: selectors.comment_submit.as_ref(),
            resolver: ElementResolver::new(self.config.timeouts.submit()),
            key_delay: self.config.timeouts.key_delay(),
            settle: self.config.timeouts.click_settle(),
        };
        let posted = TextVisible::snapshot(page, &text).await;
        let outcome = self
            .protocol
            .perform(page, "comment", &selectors.comment_box, &compose, &posted)
            .await;

        match &outcome {
            ActionOutcome::Confirmed { .. } => info!("Commented: {}", text),
            ActionOutcome::NotFound => {
                warn!("Could not find an interactive comment box after trying all selectors");
                self.diagnostics
                    .capture(page, diagnostics::COMMENT_BOX_NOT_FOUND)
                    .await;
            }
            ActionOutcome::AttemptedUnconfirmed { .. } => {
                warn!("Comment not confirmed: {}", outcome);
                self.diagnostics
                    .capture(page, diagnostics::COMMENT_ERROR)
                    .await;
            }
        }
        (text, outcome)
    }

    async fn comment_text(&self, page: &mut dyn Page) -> String {
        if self.config.comment_source == CommentSource::Pool {
            if let Some(pick) = CommentPool::new(self.config.comment_pool.clone()).pick() {
                return pick.to_string();
            }
        }

        let context = GenerationContext {
            text: self.post_description(page).await,
            sender_name: None,
        };
        if context.text.is_none() {
            info!("No post description extracted, requesting a contextless comment");
        }
        self.generator
            .generate(GenerationKind::Comment, &context)
            .await
    }

    async fn post_description(&self, page: &mut dyn Page) -> Option<String> {
        let element = self
            .protocol
            .resolver()
            .resolve_with_timeout(
                page,
                &self.profile.post.description,
                self.config.timeouts.scan_field(),
            )
            .await?;
        match page.text_of(&element.handle).await {
            Ok(text) => text.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Could not read post description: {}", e);
                None
            }
        }
    }
}
