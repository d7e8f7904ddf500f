mod common;

use async_trait::async_trait;
use common::{HOME, MockPage, MockView, test_config, test_profile};
use serde_json::{Value, json};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use veyra_engine::backend::{BackendError, BrowserSession, Page};
use veyra_engine::workflow::manual_login;

/// Session whose tab count follows a script; the operator "closes" the tab
/// once the script runs out.
struct ScriptedSession {
    tab_counts: VecDeque<usize>,
    last_count: usize,
    snapshots: u32,
    pages_opened: u32,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn new_page(&mut self) -> Result<Box<dyn Page>, BackendError> {
        self.pages_opened += 1;
        Ok(Box::new(MockPage::new().view(HOME, MockView::new())))
    }

    async fn open_page_count(&mut self) -> Result<usize, BackendError> {
        self.last_count = self.tab_counts.pop_front().unwrap_or(0);
        Ok(self.last_count)
    }

    async fn persist_state(&mut self) -> Result<Value, BackendError> {
        self.snapshots += 1;
        // Local storage can only be read while a tab is open.
        let origins = if self.last_count > 0 {
            json!([{ "origin": "https://chat.test", "localStorage": [{ "name": "k", "value": "v" }] }])
        } else {
            json!([])
        };
        Ok(json!({
            "cookies": [{ "name": "sessionid", "value": format!("v{}", self.snapshots) }],
            "origins": origins,
        }))
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn session_is_saved_once_every_tab_is_closed() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut session = ScriptedSession {
        tab_counts: VecDeque::from([1, 2, 1]),
        last_count: 0,
        snapshots: 0,
        pages_opened: 0,
    };

    let path = manual_login(&mut session, &test_profile(), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(path, config.session_file());
    assert_eq!(session.pages_opened, 1);
    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    // Cookies come from the final snapshot, local storage from the last one
    // taken while a tab was still open.
    assert_eq!(saved["cookies"][0]["value"], format!("v{}", session.snapshots));
    assert_eq!(saved["origins"][0]["origin"], "https://chat.test");
}

#[tokio::test(start_paused = true)]
async fn cancelling_still_writes_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut session = ScriptedSession {
        tab_counts: VecDeque::from(vec![1; 1000]),
        last_count: 0,
        snapshots: 0,
        pages_opened: 0,
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let path = manual_login(&mut session, &test_profile(), &config, &cancel)
        .await
        .unwrap();

    assert!(path.exists());
}
