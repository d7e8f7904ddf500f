//! Screenshot side channel for operator debugging. Nothing reads these back.

use crate::backend::Page;
use std::path::PathBuf;
use tracing::{info, warn};

pub const LOGIN_WAIT: &str = "login_wait";
pub const REDIRECT_ERROR: &str = "redirect_error";
pub const LIKE_FAIL: &str = "like_fail";
pub const COMMENT_BOX_NOT_FOUND: &str = "comment_box_not_found";
pub const COMMENT_ERROR: &str = "comment_error";
pub const THREAD_ERROR: &str = "thread_error";

#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
    prefix: String,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.png", self.prefix, name))
    }

    /// Capture the viewport to the fixed file for `name`. Failures are logged only.
    pub async fn capture(&self, page: &mut dyn Page, name: &str) -> Option<PathBuf> {
        let path = self.path_for(name);
        let bytes = match page.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Screenshot {} failed: {}", path.display(), e);
                return None;
            }
        };
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!("Could not write {}: {}", path.display(), e);
            return None;
        }
        info!("Saved screenshot {} ({} bytes)", path.display(), bytes.len());
        Some(path)
    }
}
