use async_trait::async_trait;
pub use veyra_common::error::BackendError;
use veyra_common::protocol::{Cookie, ElementHandle, Matcher, NavigationResult, RequiredState};
use std::time::Duration;

/// The Page trait is the DOM-level seam every browser backend implements.
///
/// Handles returned by `query`/`query_all` are stamped with the page generation.
/// Any navigation bumps the generation, and backends must reject older handles
/// with `BackendError::StaleHandle`.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the document to load, bounded by `timeout`.
    async fn goto(&mut self, url: &str, timeout: Duration)
    -> Result<NavigationResult, BackendError>;

    /// URL of the current document, after any redirects.
    async fn current_url(&mut self) -> Result<String, BackendError>;

    /// One probe: first node matching `matcher` (inside `scope` if given) that is
    /// in `state` right now. `Ok(None)` means "not yet", not an error.
    async fn query(
        &mut self,
        scope: Option<&ElementHandle>,
        matcher: &Matcher,
        state: RequiredState,
    ) -> Result<Option<ElementHandle>, BackendError>;

    /// Every currently visible node matching `matcher`, in document order.
    async fn query_all(&mut self, matcher: &Matcher) -> Result<Vec<ElementHandle>, BackendError>;

    /// Rendered text of a node, trimmed. `None` when the node has no text.
    async fn text_of(&mut self, element: &ElementHandle) -> Result<Option<String>, BackendError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError>;

    /// Replace the node's value/content with `text` in one step.
    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), BackendError>;

    /// Type into the focused node one key at a time.
    async fn type_text(&mut self, text: &str, per_key_delay: Duration)
    -> Result<(), BackendError>;

    async fn press_key(&mut self, key: &str) -> Result<(), BackendError>;

    /// Occurrences of `text` (exact substring) in the rendered document text.
    /// Inputs, textareas and contenteditable nodes do not count: a typed but
    /// unsent draft must never read as posted.
    async fn count_text(&mut self, text: &str) -> Result<usize, BackendError>;

    /// Scroll the node matching `container` (or the window) down by `delta_px`.
    async fn scroll_by(
        &mut self,
        container: Option<&Matcher>,
        delta_px: i64,
    ) -> Result<(), BackendError>;

    async fn cookies(&mut self) -> Result<Vec<Cookie>, BackendError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError>;
}

/// A launched browser with its persistent profile.
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> Result<Box<dyn Page>, BackendError>;

    /// Number of tabs still open, including ones the operator opened by hand.
    async fn open_page_count(&mut self) -> Result<usize, BackendError>;

    /// Cookies and local storage as an opaque JSON snapshot.
    async fn persist_state(&mut self) -> Result<serde_json::Value, BackendError>;

    async fn close(&mut self) -> Result<(), BackendError>;
}
