#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use veyra_engine::backend::{BackendError, Page};
use veyra_engine::config::AgentConfig;
use veyra_engine::platform::{InboxSelectors, Platform, PlatformProfile, PostSelectors};
use veyra_engine::protocol::{
    Cookie, ElementHandle, Matcher, NavigationResult, RequiredState, SelectorChain,
};

#[derive(Debug, Clone)]
pub enum Effect {
    /// Load another view, as a link or client-side route would.
    Navigate(String),
    Show(String),
    Hide(String),
    /// Publish the current draft into the document text.
    Send,
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub id: String,
    pub matchers: Vec<Matcher>,
    pub parent: Option<String>,
    pub text: Option<String>,
    pub present: bool,
    pub editable: bool,
    pub enabled: bool,
    pub on_click: Vec<Effect>,
}

impl MockElement {
    pub fn new(id: &str, matcher: Matcher) -> Self {
        Self {
            id: id.to_string(),
            matchers: vec![matcher],
            parent: None,
            text: None,
            present: true,
            editable: false,
            enabled: true,
            on_click: Vec::new(),
        }
    }

    pub fn css(id: &str, selector: &str) -> Self {
        Self::new(id, Matcher::css(selector))
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn inside(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.present = false;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockView {
    pub elements: Vec<MockElement>,
    pub on_enter: Vec<Effect>,
    pub on_scroll: Vec<Effect>,
    pub redirect: Option<String>,
}

impl MockView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn on_enter(mut self, effect: Effect) -> Self {
        self.on_enter.push(effect);
        self
    }

    pub fn on_scroll(mut self, effect: Effect) -> Self {
        self.on_scroll.push(effect);
        self
    }

    pub fn redirect_to(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    /// A thread-list row with name, preview and timestamp children.
    pub fn with_row(self, id: &str, name: &str, preview: &str, time: &str) -> Self {
        self.with(MockElement::css(id, ".row").text(&format!("{}\n{} · {}", name, preview, time)))
            .with(MockElement::css(&format!("{}-name", id), ".name").inside(id).text(name))
            .with(
                MockElement::css(&format!("{}-preview", id), ".preview")
                    .inside(id)
                    .text(preview),
            )
            .with(MockElement::css(&format!("{}-time", id), ".time").inside(id).text(time))
    }

    pub fn hide(mut self, id: &str) -> Self {
        for element in self.elements.iter_mut().filter(|e| e.id == id) {
            element.present = false;
        }
        self
    }

    /// Make clicking `id` load `url`.
    pub fn link(mut self, id: &str, url: &str) -> Self {
        for element in self.elements.iter_mut().filter(|e| e.id == id) {
            element.on_click.push(Effect::Navigate(url.to_string()));
        }
        self
    }

    pub fn with_unread_badge(self, row: &str) -> Self {
        self.with(MockElement::css(&format!("{}-badge", row), ".unread").inside(row))
    }
}

/// Scripted page: a set of views keyed by URL, and a log of every interaction.
#[derive(Default)]
pub struct MockPage {
    views: HashMap<String, MockView>,
    live: MockView,
    pub url: String,
    generation: u64,
    draft: String,
    /// The editable element holding the draft.
    focused: Option<String>,
    pub sent: Vec<(String, String)>,
    pub gotos: Vec<String>,
    pub log: Vec<String>,
    pub cookies: Vec<Cookie>,
    pub screenshots: usize,
    goto_counts: HashMap<String, usize>,
    fail_goto: HashMap<String, usize>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, url: &str, view: MockView) -> Self {
        self.views.insert(url.to_string(), view);
        self
    }

    pub fn cookie(mut self, name: &str) -> Self {
        self.cookies.push(Cookie {
            name: name.to_string(),
            value: "1".to_string(),
            domain: None,
            path: None,
            expires: None,
            http_only: None,
            secure: None,
        });
        self
    }

    /// Every `goto(url)` from the `nth` visit on fails.
    pub fn fail_goto_from(mut self, url: &str, nth: usize) -> Self {
        self.fail_goto.insert(url.to_string(), nth);
        self
    }

    pub fn gotos_to(&self, url: &str) -> usize {
        self.gotos.iter().filter(|u| *u == url).count()
    }

    pub fn clicked(&self, id: &str) -> bool {
        self.log.iter().any(|l| *l == format!("click:{}", id))
    }

    pub fn interactions_with(&self, id: &str) -> usize {
        self.log
            .iter()
            .filter(|l| l.split_once(':').is_some_and(|(_, target)| target == id))
            .count()
    }

    fn load(&mut self, url: &str) {
        self.generation += 1;
        self.draft.clear();
        self.focused = None;
        let mut target = url.to_string();
        let mut view = self.views.get(url).cloned().unwrap_or_default();
        if let Some(redirect) = view.redirect.clone() {
            view = self.views.get(&redirect).cloned().unwrap_or_default();
            target = redirect;
        }
        self.url = target;
        self.live = view;
    }

    fn element(&self, handle: &ElementHandle) -> Result<&MockElement, BackendError> {
        if handle.generation != self.generation {
            return Err(BackendError::StaleHandle {
                handle: handle.id.clone(),
                handle_generation: handle.generation,
                current: self.generation,
            });
        }
        self.live
            .elements
            .iter()
            .find(|e| e.id == handle.id && e.present)
            .ok_or_else(|| BackendError::Detached {
                handle: handle.id.clone(),
            })
    }

    fn handle(&self, element: &MockElement) -> ElementHandle {
        ElementHandle {
            id: element.id.clone(),
            generation: self.generation,
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Navigate(url) => self.load(&url),
                Effect::Show(id) => self.set_present(&id, true),
                Effect::Hide(id) => self.set_present(&id, false),
                Effect::Send => {
                    if !self.draft.is_empty() {
                        let text = std::mem::take(&mut self.draft);
                        self.sent.push((self.url.clone(), text));
                    }
                }
            }
        }
    }

    fn set_present(&mut self, id: &str, present: bool) {
        for element in self.live.elements.iter_mut().filter(|e| e.id == id) {
            element.present = present;
        }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(
        &mut self,
        url: &str,
        _timeout: Duration,
    ) -> Result<NavigationResult, BackendError> {
        self.gotos.push(url.to_string());
        let count = self.goto_counts.entry(url.to_string()).or_default();
        *count += 1;
        if self.fail_goto.get(url).is_some_and(|nth| *count >= *nth) {
            return Err(BackendError::Navigation("net::ERR_CONNECTION_RESET".into()));
        }
        self.load(url);
        Ok(NavigationResult {
            url: self.url.clone(),
            title: String::new(),
        })
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        Ok(self.url.clone())
    }

    async fn query(
        &mut self,
        scope: Option<&ElementHandle>,
        matcher: &Matcher,
        state: RequiredState,
    ) -> Result<Option<ElementHandle>, BackendError> {
        if let Some(scope) = scope {
            self.element(scope)?;
        }
        let found = self.live.elements.iter().find(|e| {
            e.present
                && e.matchers.contains(matcher)
                && scope.is_none_or(|s| e.parent.as_deref() == Some(s.id.as_str()))
                && match state {
                    RequiredState::Visible => true,
                    RequiredState::Editable => e.editable,
                    RequiredState::Enabled => e.enabled,
                }
        });
        Ok(found.map(|e| self.handle(e)))
    }

    async fn query_all(&mut self, matcher: &Matcher) -> Result<Vec<ElementHandle>, BackendError> {
        Ok(self
            .live
            .elements
            .iter()
            .filter(|e| e.present && e.matchers.contains(matcher))
            .map(|e| self.handle(e))
            .collect())
    }

    async fn text_of(&mut self, element: &ElementHandle) -> Result<Option<String>, BackendError> {
        let found = self.element(element)?;
        // An unsent draft renders inside its composer.
        if found.editable
            && self.focused.as_deref() == Some(found.id.as_str())
            && !self.draft.is_empty()
        {
            return Ok(Some(self.draft.clone()));
        }
        Ok(found.text.clone())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError> {
        let effects = self.element(element)?.on_click.clone();
        self.log.push(format!("click:{}", element.id));
        self.apply(effects);
        Ok(())
    }

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), BackendError> {
        if !self.element(element)?.editable {
            return Err(BackendError::Other(format!("{} is not editable", element.id)));
        }
        self.log.push(format!("fill:{}", element.id));
        self.draft = text.to_string();
        self.focused = Some(element.id.clone());
        Ok(())
    }

    async fn type_text(
        &mut self,
        text: &str,
        _per_key_delay: Duration,
    ) -> Result<(), BackendError> {
        self.log.push(format!("type:{}", text));
        self.draft.push_str(text);
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<(), BackendError> {
        self.log.push(format!("key:{}", key));
        if key == "Enter" {
            let effects = self.live.on_enter.clone();
            self.apply(effects);
        }
        Ok(())
    }

    async fn count_text(&mut self, text: &str) -> Result<usize, BackendError> {
        if text.is_empty() {
            return Ok(0);
        }
        let in_dom: usize = self
            .live
            .elements
            .iter()
            .filter(|e| e.present && !e.editable)
            .filter_map(|e| e.text.as_deref())
            .map(|t| t.matches(text).count())
            .sum();
        let in_sent: usize = self
            .sent
            .iter()
            .filter(|(url, _)| *url == self.url)
            .map(|(_, sent)| sent.matches(text).count())
            .sum();
        Ok(in_dom + in_sent)
    }

    async fn scroll_by(
        &mut self,
        _container: Option<&Matcher>,
        _delta_px: i64,
    ) -> Result<(), BackendError> {
        self.log.push("scroll:list".to_string());
        let effects = self.live.on_scroll.clone();
        self.apply(effects);
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<Cookie>, BackendError> {
        Ok(self.cookies.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        self.screenshots += 1;
        Ok(b"\x89PNG".to_vec())
    }
}

pub const ORIGIN: &str = "https://chat.test";
pub const HOME: &str = "https://chat.test/";
pub const INBOX: &str = "https://chat.test/inbox/";
pub const REQUESTS: &str = "https://chat.test/inbox/requests/";
pub const LOGIN: &str = "https://chat.test/accounts/login/";

/// A platform profile over the mock's simple class selectors.
pub fn test_profile() -> PlatformProfile {
    PlatformProfile {
        platform: Platform::Instagram,
        origin: ORIGIN.to_string(),
        home_url: HOME.to_string(),
        session_cookie: "sessionid".to_string(),
        login_markers: vec!["accounts/login".to_string()],
        landmarks: SelectorChain::visible_css([".avatar", ".new-post"]),
        post: PostSelectors {
            liked: SelectorChain::visible_css([".unlike", ".liked-icon"]),
            like_button: SelectorChain::visible_css([".like", ".like-icon"]),
            comment_box: SelectorChain::new()
                .editable(Matcher::css("textarea.comment"))
                .editable(Matcher::css("div.comment[contenteditable]"))
                .editable(Matcher::css("textarea[placeholder*=\"Comment\"]"))
                .editable(Matcher::role("textbox")),
            comment_submit: Some(SelectorChain::new().enabled(Matcher::css(".post-comment"))),
            description: SelectorChain::visible_css([".caption"]),
        },
        inbox: InboxSelectors {
            root_url: INBOX.to_string(),
            thread_list: Some(Matcher::css(".threads")),
            thread_rows: SelectorChain::visible_css([".row"]),
            name: SelectorChain::visible_css([".name"]),
            preview: SelectorChain::visible_css([".preview"]),
            timestamp: SelectorChain::visible_css([".time"]),
            unread_badge: SelectorChain::visible_css([".unread"]),
            requests_tab: SelectorChain::new().visible(Matcher::css_text("a.tab", "Requests")),
            accept_button: SelectorChain::new().visible(Matcher::css_text("button", "Accept")),
            message_input: SelectorChain::new().editable(Matcher::css(".composer")),
            send_button: None,
        },
    }
}

/// Small timeouts so paused-clock tests stay short.
pub fn test_config(dir: &std::path::Path) -> AgentConfig {
    let mut config = AgentConfig {
        min_delay_sec: 0,
        max_delay_sec: 0,
        comment_pool: vec!["Great shot!".to_string()],
        profile_dir: Some(dir.join("profile")),
        diagnostics_dir: dir.to_path_buf(),
        ..AgentConfig::default()
    };
    config.timeouts.navigation_ms = 1_000;
    config.timeouts.page_settle_ms = 10;
    config.timeouts.candidate_ms = 200;
    config.timeouts.precheck_ms = 100;
    config.timeouts.confirm_ms = 500;
    config.timeouts.submit_ms = 100;
    config.timeouts.landmark_ms = 100;
    config.timeouts.login_poll_ms = 1_000;
    config.timeouts.scan_field_ms = 50;
    config.timeouts.relocate_ms = 300;
    config.timeouts.item_ms = 30_000;
    config.timeouts.key_delay_ms = 0;
    config.timeouts.click_settle_ms = 10;
    config.inbox.scroll_iterations = 1;
    config
}

/// A logged-in home page.
pub fn home_view() -> MockView {
    MockView::new().with(MockElement::css("avatar", ".avatar"))
}
