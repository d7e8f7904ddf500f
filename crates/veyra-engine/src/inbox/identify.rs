use super::{ScannedThread, ThreadClassification, ThreadIdentifier};
use crate::backend::Page;
use crate::platform::InboxSelectors;
use crate::resolver::ElementResolver;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use veyra_common::protocol::{ElementHandle, SelectorChain};

const RELOCATE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Reads thread rows into value identifiers, and finds them again by content.
pub struct ThreadScanner<'a> {
    selectors: &'a InboxSelectors,
    resolver: ElementResolver,
    field_timeout: Duration,
    scroll_iterations: usize,
    scroll_step_px: i64,
    scroll_settle: Duration,
}

impl<'a> ThreadScanner<'a> {
    pub fn new(
        selectors: &'a InboxSelectors,
        field_timeout: Duration,
        scroll_iterations: usize,
        scroll_step_px: i64,
        scroll_settle: Duration,
    ) -> Self {
        Self {
            selectors,
            resolver: ElementResolver::new(field_timeout),
            field_timeout,
            scroll_iterations,
            scroll_step_px,
            scroll_settle,
        }
    }

    /// Scan the currently shown list, scrolling to load lazy rows.
    ///
    /// `forced` overrides the per-row unread check (the requests view marks
    /// everything it lists as a request). Repeats across passes are left in;
    /// callers run [`dedup`] over the combined result.
    pub async fn scan(
        &self,
        page: &mut dyn Page,
        forced: Option<ThreadClassification>,
    ) -> Vec<ScannedThread> {
        let mut found = Vec::new();
        for pass in 0..=self.scroll_iterations {
            let rows = find_rows(page, &self.selectors.thread_rows).await;
            debug!(pass, rows = rows.len(), "scanning thread list");
            for row in &rows {
                if let Some(thread) = self.read_row(page, row, forced).await {
                    found.push(thread);
                }
            }

            if pass == self.scroll_iterations {
                break;
            }
            if let Err(e) = page
                .scroll_by(self.selectors.thread_list.as_ref(), self.scroll_step_px)
                .await
            {
                warn!("Could not scroll thread list: {}", e);
                break;
            }
            tokio::time::sleep(self.scroll_settle).await;
        }
        found
    }

    async fn read_row(
        &self,
        page: &mut dyn Page,
        row: &ElementHandle,
        forced: Option<ThreadClassification>,
    ) -> Option<ScannedThread> {
        let Some(name) = self.field(page, row, &self.selectors.name).await else {
            debug!("Row {} has no sender name, skipping", row);
            return None;
        };
        let preview = self
            .field(page, row, &self.selectors.preview)
            .await
            .unwrap_or_default();
        let timestamp = self
            .field(page, row, &self.selectors.timestamp)
            .await
            .unwrap_or_default();

        let classification = match forced {
            Some(c) => c,
            None => {
                let badge = self
                    .resolver
                    .resolve_within(page, row, &self.selectors.unread_badge, self.field_timeout)
                    .await;
                if badge.is_some() {
                    ThreadClassification::Unread
                } else {
                    ThreadClassification::Read
                }
            }
        };

        Some(ScannedThread {
            identifier: ThreadIdentifier::new(name, preview, timestamp),
            classification,
        })
    }

    async fn field(
        &self,
        page: &mut dyn Page,
        row: &ElementHandle,
        chain: &SelectorChain,
    ) -> Option<String> {
        let element = self
            .resolver
            .resolve_within(page, row, chain, self.field_timeout)
            .await?;
        match page.text_of(&element.handle).await {
            Ok(text) => text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) => {
                debug!("Could not read text of {}: {}", element.handle, e);
                None
            }
        }
    }

    /// Find the row whose rendered text carries `identifier`, polling until
    /// `timeout`. The first misses scroll the list the same way [`scan`] did,
    /// so rows that only load lazily are reachable again. Matching happens
    /// here against plain strings; nothing from the identifier is spliced
    /// into a selector.
    ///
    /// [`scan`]: Self::scan
    pub async fn relocate(
        &self,
        page: &mut dyn Page,
        identifier: &ThreadIdentifier,
        timeout: Duration,
    ) -> Option<ElementHandle> {
        let deadline = Instant::now() + timeout;
        let mut scrolls = 0;
        loop {
            for row in find_rows(page, &self.selectors.thread_rows).await {
                match page.text_of(&row).await {
                    Ok(Some(text)) if identifier.matches_text(&text) => {
                        info!("Re-located thread {}", identifier);
                        return Some(row);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("Could not read row {}: {}", row, e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let pause = if scrolls < self.scroll_iterations {
                scrolls += 1;
                if let Err(e) = page
                    .scroll_by(self.selectors.thread_list.as_ref(), self.scroll_step_px)
                    .await
                {
                    debug!("Could not scroll while re-locating: {}", e);
                }
                self.scroll_settle
            } else {
                RELOCATE_POLL_INTERVAL
            };
            tokio::time::sleep(pause.min(deadline - now)).await;
        }
    }
}

/// Rows from the first row selector that yields any.
pub async fn find_rows(page: &mut dyn Page, chain: &SelectorChain) -> Vec<ElementHandle> {
    for candidate in chain.candidates() {
        match page.query_all(&candidate.matcher).await {
            Ok(rows) if !rows.is_empty() => return rows,
            Ok(_) => {}
            Err(e) => warn!("Error listing rows via `{}`: {}", candidate.matcher, e),
        }
    }
    Vec::new()
}

/// Drop repeated identifiers, keeping the first occurrence and its order.
pub fn dedup(threads: Vec<ScannedThread>) -> Vec<ScannedThread> {
    let mut seen = HashSet::new();
    threads
        .into_iter()
        .filter(|t| seen.insert(t.identifier.clone()))
        .collect()
}
