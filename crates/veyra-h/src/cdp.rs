use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::Path;
use tokio::task::JoinHandle;
use veyra_common::BackendError;

/// A launched Chromium bound to one persistent profile directory.
pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
}

impl CdpClient {
    pub async fn launch(profile_dir: &Path, visible: bool) -> Result<Self, BackendError> {
        std::fs::create_dir_all(profile_dir)
            .map_err(|e| BackendError::Other(format!("Cannot create profile dir: {}", e)))?;

        let mut config_builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .window_size(1280, 900);
        if visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }
        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }
        tracing::info!("Using profile dir: {}", profile_dir.display());

        let config = config_builder
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build browser config: {}", e)))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BackendError::Other(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::debug!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::info!("Browser handler task ended");
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open a tab with JavaScript dialogs auto-accepted, so a stray
    /// `confirm()` never blocks probe evaluation.
    pub async fn new_page(&self, url: &str) -> Result<Page, BackendError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| BackendError::Other(format!("Failed to create page: {}", e)))?;

        let mut dialog_events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| BackendError::Other(format!("Failed to subscribe to dialogs: {}", e)))?;
        let page_clone = page.clone();
        tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                tracing::info!(
                    "Handling JavaScript dialog: {} ({:?})",
                    event.message,
                    event.r#type
                );
                if let Err(e) = page_clone
                    .execute(HandleJavaScriptDialogParams::new(true))
                    .await
                {
                    tracing::warn!("Failed to accept dialog: {}", e);
                }
            }
        });

        Ok(page)
    }

    pub async fn pages(&self) -> Result<Vec<Page>, BackendError> {
        self.browser
            .pages()
            .await
            .map_err(|e| BackendError::Other(format!("Get pages failed: {}", e)))
    }

    pub async fn close(mut self) -> Result<(), BackendError> {
        self.browser
            .close()
            .await
            .map_err(|e| BackendError::Other(format!("Error closing browser: {}", e)))?;
        self.handler_task
            .await
            .map_err(|e| BackendError::Other(format!("Error awaiting handler: {}", e)))?;
        Ok(())
    }
}
