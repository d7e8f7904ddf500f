use crate::backend::BrowserSession;
use crate::config::AgentConfig;
use crate::error::EngineError;
use crate::platform::PlatformProfile;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TAB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Open the platform home and let the operator log in by hand. Returns once
/// every tab is closed (or `cancel` fires), after writing the session snapshot.
pub async fn manual_login(
    session: &mut dyn BrowserSession,
    profile: &PlatformProfile,
    config: &AgentConfig,
    cancel: &CancellationToken,
) -> Result<PathBuf, EngineError> {
    info!("Launching browser in manual mode for {}...", profile.platform);
    let mut page = session.new_page().await?;
    if let Err(e) = page.goto(&profile.home_url, config.timeouts.navigation()).await {
        warn!("Initial navigation did not finish ({}), the tab stays open", e);
    }
    drop(page);
    info!("Please log in manually, then close the browser tab.");

    let mut last_snapshot = None;
    loop {
        match session.open_page_count().await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Could not count open tabs, assuming the browser closed: {}", e);
                break;
            }
        }
        // Local storage is only readable while a tab is open.
        match session.persist_state().await {
            Ok(state) => last_snapshot = Some(state),
            Err(e) => debug!("Intermediate snapshot failed: {}", e),
        }
        tokio::select! {
            _ = tokio::time::sleep(TAB_POLL_INTERVAL) => {}
            _ = cancel.cancelled() => {
                info!("Manual mode interrupted, saving what we have");
                break;
            }
        }
    }

    info!("Saving cookies and localStorage...");
    let state = match session.persist_state().await {
        Ok(state) => merge_snapshots(state, last_snapshot),
        Err(e) => {
            warn!("Final snapshot failed ({}), using the last one taken", e);
            last_snapshot.ok_or(EngineError::Backend(e))?
        }
    };

    let path = config.session_file();
    write_session_file(&path, &state).await?;
    info!("Session saved to {}", path.display());
    Ok(path)
}

/// Keep the final cookies; fall back to earlier origins when the final
/// snapshot had no tab left to read local storage from.
fn merge_snapshots(mut latest: Value, earlier: Option<Value>) -> Value {
    let has_origins = latest
        .get("origins")
        .and_then(Value::as_array)
        .is_some_and(|o| !o.is_empty());
    if !has_origins {
        if let Some(origins) = earlier.and_then(|mut e| e.get_mut("origins").map(Value::take)) {
            if let Some(obj) = latest.as_object_mut() {
                obj.insert("origins".to_string(), origins);
            }
        }
    }
    latest
}

pub async fn write_session_file(path: &Path, state: &Value) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(state).map_err(std::io::Error::other)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
