use crate::cdp::CdpClient;
use crate::inject::{self, probe_error};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::storage::GetCookiesParams;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use veyra_common::BackendError;
use veyra_common::protocol::{Cookie, ElementHandle, Matcher, NavigationResult, RequiredState};
use veyra_engine::backend::{BrowserSession, Page};

/// One Chromium tab driven through the injected probe.
pub struct CdpPage {
    page: chromiumoxide::Page,
    generation: u64,
    doc: Option<String>,
}

impl CdpPage {
    pub fn new(page: chromiumoxide::Page) -> Self {
        Self {
            page,
            generation: 0,
            doc: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn check(&self, handle: &ElementHandle) -> Result<(), BackendError> {
        if handle.generation != self.generation {
            return Err(BackendError::StaleHandle {
                handle: handle.id.clone(),
                handle_generation: handle.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn stamp(&self, id: String) -> ElementHandle {
        ElementHandle {
            id,
            generation: self.generation,
        }
    }

    /// Run a probe op. A document swap seen here (a click that followed a
    /// link, a client-side reload) counts as navigation.
    async fn probe(&mut self, request: Value) -> Result<Value, BackendError> {
        let reply = inject::call(&self.page, request).await?;
        if self.doc.as_deref().is_some_and(|doc| doc != reply.doc) {
            self.generation += 1;
            debug!("Document changed under us, page generation now {}", self.generation);
        }
        self.doc = Some(reply.doc);
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(probe_error(reply.error.as_deref().unwrap_or("probe failed")))
        }
    }

    async fn key_event(
        &self,
        kind: DispatchKeyEventType,
        key: &str,
    ) -> Result<(), BackendError> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind.clone()).key(key).code(key);
        if key == "Enter" {
            builder = builder
                .windows_virtual_key_code(13)
                .native_virtual_key_code(13);
            if kind == DispatchKeyEventType::KeyDown {
                builder = builder.text("\r");
            }
        }
        let event = builder
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build key event: {:?}", e)))?;
        self.page
            .execute(event)
            .await
            .map_err(|e| BackendError::Other(format!("press_key failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<NavigationResult, BackendError> {
        info!("Navigating to: {}", url);
        let navigation = tokio::time::timeout(timeout, self.page.goto(url)).await;
        // Whatever happened, handles from the old document are gone.
        self.generation += 1;
        self.doc = None;
        match navigation {
            Err(_) => {
                return Err(BackendError::TimeoutWithContext {
                    operation: format!("navigating to {}", url),
                });
            }
            Ok(Err(e)) => return Err(BackendError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        let title = self
            .page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        Ok(NavigationResult {
            url: self.current_url().await?,
            title,
        })
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        self.page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .ok_or_else(|| BackendError::Navigation("page has no URL".into()))
    }

    async fn query(
        &mut self,
        scope: Option<&ElementHandle>,
        matcher: &Matcher,
        state: RequiredState,
    ) -> Result<Option<ElementHandle>, BackendError> {
        if let Some(scope) = scope {
            self.check(scope)?;
        }
        let value = self
            .probe(json!({
                "op": "query",
                "scope": scope.map(|s| s.id.as_str()),
                "matcher": matcher,
                "state": state,
            }))
            .await?;
        Ok(value.as_str().map(|id| self.stamp(id.to_string())))
    }

    async fn query_all(&mut self, matcher: &Matcher) -> Result<Vec<ElementHandle>, BackendError> {
        let value = self
            .probe(json!({ "op": "queryAll", "matcher": matcher }))
            .await?;
        let ids: Vec<String> = serde_json::from_value(value)?;
        Ok(ids.into_iter().map(|id| self.stamp(id)).collect())
    }

    async fn text_of(&mut self, element: &ElementHandle) -> Result<Option<String>, BackendError> {
        self.check(element)?;
        let value = self
            .probe(json!({ "op": "text", "id": element.id }))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError> {
        self.check(element)?;
        self.probe(json!({ "op": "click", "id": element.id }))
            .await?;
        Ok(())
    }

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), BackendError> {
        self.check(element)?;
        self.probe(json!({ "op": "fill", "id": element.id, "value": text }))
            .await?;
        Ok(())
    }

    async fn type_text(
        &mut self,
        text: &str,
        per_key_delay: Duration,
    ) -> Result<(), BackendError> {
        for ch in text.chars() {
            self.page
                .execute(InsertTextParams::new(ch.to_string()))
                .await
                .map_err(|e| BackendError::Other(format!("type_text failed: {}", e)))?;
            if !per_key_delay.is_zero() {
                tokio::time::sleep(per_key_delay).await;
            }
        }
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<(), BackendError> {
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn count_text(&mut self, text: &str) -> Result<usize, BackendError> {
        let value = self
            .probe(json!({ "op": "countText", "needle": text }))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn scroll_by(
        &mut self,
        container: Option<&Matcher>,
        delta_px: i64,
    ) -> Result<(), BackendError> {
        self.probe(json!({ "op": "scroll", "container": container, "delta": delta_px }))
            .await?;
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<Cookie>, BackendError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BackendError::Other(format!("Get cookies failed: {}", e)))?;

        Ok(cookies
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
                expires: Some(c.expires),
                http_only: Some(c.http_only),
                secure: Some(c.secure),
            })
            .collect())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        self.page
            .screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))
    }
}

const LOCAL_STORAGE_JS: &str = r#"({
    origin: location.origin,
    localStorage: Object.keys(localStorage).map((k) => ({ name: k, value: localStorage.getItem(k) }))
})"#;

/// A persistent-profile Chromium session.
pub struct HeadlessSession {
    client: Option<CdpClient>,
}

impl HeadlessSession {
    pub async fn launch(profile_dir: &Path, visible: bool) -> Result<Self, BackendError> {
        info!("Launching Chromium session...");
        let client = CdpClient::launch(profile_dir, visible).await?;
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> Result<&CdpClient, BackendError> {
        self.client.as_ref().ok_or(BackendError::NotReady)
    }

    async fn all_cookies(&self) -> Result<Vec<Value>, BackendError> {
        let response = self
            .client()?
            .browser
            .execute(GetCookiesParams::default())
            .await
            .map_err(|e| BackendError::Other(format!("Get cookies failed: {}", e)))?;
        Ok(response
            .result
            .cookies
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "value": c.value,
                    "domain": c.domain,
                    "path": c.path,
                    "expires": c.expires,
                    "httpOnly": c.http_only,
                    "secure": c.secure,
                    "sameSite": serde_json::to_value(&c.same_site).unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn local_storage(&self) -> Vec<Value> {
        let listed = match self.client() {
            Ok(client) => client.pages().await,
            Err(e) => Err(e),
        };
        let pages = match listed {
            Ok(pages) => pages,
            Err(e) => {
                debug!("Could not list pages for local storage: {}", e);
                return Vec::new();
            }
        };

        let mut origins: Vec<Value> = Vec::new();
        for page in pages {
            let entry = match page.evaluate(LOCAL_STORAGE_JS).await {
                Ok(result) => result.into_value::<Value>().ok(),
                Err(e) => {
                    debug!("Skipping page without readable local storage: {}", e);
                    None
                }
            };
            let Some(entry) = entry else { continue };
            let origin = entry["origin"].as_str().unwrap_or_default();
            if origin.starts_with("http") && !origins.iter().any(|o| o["origin"] == origin) {
                origins.push(entry);
            }
        }
        origins
    }
}

#[async_trait]
impl BrowserSession for HeadlessSession {
    async fn new_page(&mut self) -> Result<Box<dyn Page>, BackendError> {
        let page = self.client()?.new_page("about:blank").await?;
        Ok(Box::new(CdpPage::new(page)))
    }

    async fn open_page_count(&mut self) -> Result<usize, BackendError> {
        Ok(self.client()?.pages().await?.len())
    }

    /// `{cookies, origins: [{origin, localStorage}]}`, the shape other
    /// browser tooling loads as storage state.
    async fn persist_state(&mut self) -> Result<Value, BackendError> {
        let cookies = self.all_cookies().await?;
        let origins = self.local_storage().await;
        Ok(json!({ "cookies": cookies, "origins": origins }))
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}
