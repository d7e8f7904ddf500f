use super::identify::{ThreadScanner, dedup};
use super::{ReconcileOutcome, ReconciliationRecord, ScannedThread, ThreadClassification};
use crate::action::{ActionProtocol, Click, Compose, Gone, TextVisible};
use crate::backend::Page;
use crate::config::AgentConfig;
use crate::diagnostics::{self, Diagnostics};
use crate::error::EngineError;
use crate::generator::{GenerationContext, GenerationKind, SafeGenerator};
use crate::login::{GateOutcome, LoginGate};
use crate::platform::PlatformProfile;
use crate::resolver::ElementResolver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Identify every actionable thread, then act on each one from a fresh inbox.
pub struct InboxReconciler {
    profile: PlatformProfile,
    config: AgentConfig,
    gate: LoginGate,
    protocol: ActionProtocol,
    generator: SafeGenerator,
    diagnostics: Diagnostics,
}

impl InboxReconciler {
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
        );
        Self {
            profile,
            config,
            gate,
            protocol,
            generator,
            diagnostics,
        }
    }

    fn scanner(&self) -> ThreadScanner<'_> {
        ThreadScanner::new(
            &self.profile.inbox,
            self.config.timeouts.scan_field(),
            self.config.inbox.scroll_iterations,
            self.config.inbox.scroll_step_px,
            self.config.timeouts.click_settle(),
        )
    }

    pub async fn run(
        &self,
        page: &mut dyn Page,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReconciliationRecord>, EngineError> {
        info!("Starting inbox reconciliation for {}", self.profile.platform);
        if let GateOutcome::Cancelled = self.gate.wait(page, cancel).await {
            return Err(EngineError::Cancelled);
        }

        let threads = self.identify(page).await?;
        info!("Identified {} threads", threads.len());
        self.reconcile(page, &threads, cancel).await
    }

    /// Phase one: read identifiers only. Requests are listed first.
    pub async fn identify(&self, page: &mut dyn Page) -> Result<Vec<ScannedThread>, EngineError> {
        let scanner = self.scanner();
        let mut found = Vec::new();

        self.go_home(page).await?;
        if self.config.inbox.include_requests {
            if self.enter_requests(page).await {
                let requests = scanner.scan(page, Some(ThreadClassification::Request)).await;
                info!("Found {} message requests", requests.len());
                found.extend(requests);
            } else {
                info!("No requests tab found, skipping message requests");
            }
            self.go_home(page).await?;
        }

        found.extend(scanner.scan(page, None).await);
        Ok(dedup(found))
    }

    /// Phase two. Each item ends with a return to the inbox root whatever
    /// happened to it; if that return fails the run stops with what it has.
    pub async fn reconcile(
        &self,
        page: &mut dyn Page,
        threads: &[ScannedThread],
        cancel: &CancellationToken,
    ) -> Result<Vec<ReconciliationRecord>, EngineError> {
        let mut records = Vec::with_capacity(threads.len());
        for (index, thread) in threads.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Reconciliation interrupted after {} threads", records.len());
                break;
            }
            info!(
                "[{}/{}] {} ({})",
                index + 1,
                threads.len(),
                thread.identifier,
                thread.classification
            );

            let (outcome, chat_url) =
                match tokio::time::timeout(self.config.timeouts.item(), self.process(page, thread))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => (
                        ReconcileOutcome::Error(format!(
                            "timed out after {:?}",
                            self.config.timeouts.item()
                        )),
                        None,
                    ),
                };
            if let ReconcileOutcome::Error(reason) = &outcome {
                warn!("Error processing thread {}: {}", thread.identifier, reason);
                self.diagnostics
                    .capture(page, diagnostics::THREAD_ERROR)
                    .await;
            }
            records.push(ReconciliationRecord {
                identifier: thread.identifier.clone(),
                classification: thread.classification,
                outcome,
                chat_url,
            });

            if let Err(e) = self.go_home(page).await {
                warn!("Could not return to the inbox, stopping: {}", e);
                return Err(EngineError::CleanupFailed {
                    url: self.profile.inbox.root_url.clone(),
                    reason: e.to_string(),
                    completed: records,
                });
            }
        }
        Ok(records)
    }

    async fn process(
        &self,
        page: &mut dyn Page,
        thread: &ScannedThread,
    ) -> (ReconcileOutcome, Option<String>) {
        if let Err(e) = self.go_home(page).await {
            return (ReconcileOutcome::Error(e.to_string()), None);
        }
        if thread.classification == ThreadClassification::Request && !self.enter_requests(page).await {
            return (
                ReconcileOutcome::Error("requests tab not found".to_string()),
                None,
            );
        }

        let Some(row) = self
            .scanner()
            .relocate(page, &thread.identifier, self.config.timeouts.relocate())
            .await
        else {
            return (
                ReconcileOutcome::Error("thread not found in list".to_string()),
                None,
            );
        };
        if let Err(e) = page.click(&row).await {
            return (
                ReconcileOutcome::Error(format!("could not open thread: {}", e)),
                None,
            );
        }
        tokio::time::sleep(self.config.timeouts.page_settle()).await;
        let mut chat_url = page.current_url().await.ok();

        let selectors = &self.profile.inbox;
        let accepted = if thread.classification == ThreadClassification::Request {
            let outcome = self
                .protocol
                .perform(
                    page,
                    "accept",
                    &selectors.accept_button,
                    &Click,
                    &Gone(&selectors.accept_button),
                )
                .await;
            if !outcome.is_confirmed() {
                warn!("Request from {} not accepted: {}", thread.identifier.name, outcome);
                return (ReconcileOutcome::AcceptFailed, chat_url);
            }
            tokio::time::sleep(self.config.timeouts.click_settle()).await;
            chat_url = page.current_url().await.ok().or(chat_url);
            true
        } else {
            false
        };

        if thread.classification == ThreadClassification::Read {
            info!("Thread with {} already read, no reply needed", thread.identifier.name);
            return (ReconcileOutcome::ReadNoReplyNeeded, chat_url);
        }

        let context = GenerationContext {
            text: Some(thread.identifier.last_message_preview.clone())
                .filter(|t| !t.is_empty()),
            sender_name: Some(thread.identifier.name.clone()),
        };
        let reply = self
            .generator
            .generate(GenerationKind::Reply, &context)
            .await;
        let compose = Compose {
            text: &reply,
            submit: selectors.send_button.as_ref(),
            resolver: ElementResolver::new(self.config.timeouts.submit()),
            key_delay: self.config.timeouts.key_delay(),
            settle: self.config.timeouts.click_settle(),
        };
        let delivered = TextVisible::snapshot(page, &reply).await;
        let outcome = self
            .protocol
            .perform(page, "reply", &selectors.message_input, &compose, &delivered)
            .await;

        let result = match (outcome.is_confirmed(), accepted) {
            (true, true) => ReconcileOutcome::AcceptedAndReplied,
            (true, false) => ReconcileOutcome::Replied,
            (false, _) => {
                warn!("Reply to {} not confirmed: {}", thread.identifier.name, outcome);
                ReconcileOutcome::ReplyFailed
            }
        };
        (result, chat_url)
    }

    /// Load the inbox root and check we actually stayed on the platform.
    async fn go_home(&self, page: &mut dyn Page) -> Result<(), EngineError> {
        let root = &self.profile.inbox.root_url;
        page.goto(root, self.config.timeouts.navigation())
            .await
            .map_err(|e| EngineError::from_navigation(root, e))?;
        tokio::time::sleep(self.config.timeouts.page_settle()).await;

        let landed = page.current_url().await?;
        if !self.profile.is_within_origin(&landed) || self.profile.is_login_redirect(&landed) {
            return Err(EngineError::StructuralMismatch {
                expected: root.clone(),
                actual: landed,
            });
        }
        Ok(())
    }

    async fn enter_requests(&self, page: &mut dyn Page) -> bool {
        let Some(tab) = self
            .protocol
            .resolver()
            .resolve_with_timeout(
                page,
                &self.profile.inbox.requests_tab,
                self.config.timeouts.precheck(),
            )
            .await
        else {
            return false;
        };
        if let Err(e) = page.click(&tab.handle).await {
            warn!("Could not open requests via `{}`: {}", tab.matcher, e);
            return false;
        }
        tokio::time::sleep(self.config.timeouts.page_settle()).await;
        true
    }
}
