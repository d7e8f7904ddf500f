//! Per-platform configuration: URLs, the session cookie, and every selector
//! chain the engine needs. The engine itself never names a platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use veyra_common::protocol::{Matcher, SelectorChain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
        }
    }

    pub fn profile(&self) -> PlatformProfile {
        match self {
            Platform::Facebook => facebook(),
            Platform::Instagram => instagram(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" | "fb" => Ok(Platform::Facebook),
            "instagram" | "ig" => Ok(Platform::Instagram),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub platform: Platform,
    /// Scheme + host every automated page must stay under.
    pub origin: String,
    pub home_url: String,
    pub session_cookie: String,
    /// URL fragments that mean the session bounced to a login or checkpoint page.
    pub login_markers: Vec<String>,
    /// Elements only rendered for an authenticated user.
    pub landmarks: SelectorChain,
    pub post: PostSelectors,
    pub inbox: InboxSelectors,
}

#[derive(Debug, Clone)]
pub struct PostSelectors {
    /// Present only when the post is already liked.
    pub liked: SelectorChain,
    pub like_button: SelectorChain,
    pub comment_box: SelectorChain,
    /// Explicit submit button; when absent or unresolved, Enter is pressed.
    pub comment_submit: Option<SelectorChain>,
    pub description: SelectorChain,
}

#[derive(Debug, Clone)]
pub struct InboxSelectors {
    pub root_url: String,
    /// Scrollable container holding the thread rows.
    pub thread_list: Option<Matcher>,
    /// First candidate yielding any rows is used for the whole scan.
    pub thread_rows: SelectorChain,
    pub name: SelectorChain,
    pub preview: SelectorChain,
    pub timestamp: SelectorChain,
    pub unread_badge: SelectorChain,
    pub requests_tab: SelectorChain,
    pub accept_button: SelectorChain,
    pub message_input: SelectorChain,
    pub send_button: Option<SelectorChain>,
}

impl PlatformProfile {
    /// Whether `url` lives under this platform's origin.
    pub fn is_within_origin(&self, url: &str) -> bool {
        let (Ok(origin), Ok(candidate)) = (Url::parse(&self.origin), Url::parse(url)) else {
            return false;
        };
        origin.scheme() == candidate.scheme() && origin.host_str() == candidate.host_str()
    }

    pub fn is_login_redirect(&self, url: &str) -> bool {
        self.login_markers.iter().any(|m| url.contains(m.as_str()))
    }
}

/// Build a chain of `CssText` candidates sharing one selector, one per label.
/// Used where the UI is localized and only the label text differs.
pub fn labelled(selector: &str, labels: &[&str]) -> SelectorChain {
    labels.iter().fold(SelectorChain::new(), |chain, label| {
        chain.visible(Matcher::css_text(selector, *label))
    })
}

const REQUEST_TAB_LABELS: &[&str] = &[
    "Requests",
    "Message requests",
    "Kérelmek",
    "Üzenetkérelmek",
    "Solicitudes",
];

const ACCEPT_LABELS: &[&str] = &["Accept", "Elfogadás", "Allow", "Aceptar"];

fn facebook() -> PlatformProfile {
    let liked = SelectorChain::visible_css([
        r#"div[aria-label="Tetszik eltávolítása"]"#,
        r#"div[aria-label="Unlike"]"#,
        r#"div[role="button"] i[data-visualcompletion="css-img"][style*="background-position: 0px -714px;"]"#,
        r#"span[data-ad-rendering-role="tetszik_button"][style*="color: var(--reaction-like, #0866FF);"]"#,
    ]);

    let like_button = SelectorChain::new()
        .enabled(Matcher::css(r#"div[role="button"][aria-label="Tetszik"]"#))
        .enabled(Matcher::css(r#"div[role="button"][aria-label="Like"]"#))
        .enabled(Matcher::css(
            r#"div[role="button"]:has(span[data-ad-rendering-role="tetszik_button"][style=""])"#,
        ))
        .enabled(Matcher::css(
            r#"div[role="button"]:has(span[data-ad-rendering-role="tetszik_button"]):not(:has(span[style*="color: var(--reaction-like"]))"#,
        ))
        .enabled(Matcher::css(
            r#"div[role="button"]:has(span[data-ad-rendering-role="like_button"]):not(:has(span[style*="color: var(--reaction-like"]))"#,
        ));

    let comment_box = SelectorChain::new()
        .editable(Matcher::css(
            r#"div[aria-label="Hozzászólás írása…"][contenteditable="true"][role="textbox"]"#,
        ))
        .editable(Matcher::css(
            r#"div[aria-label="Write a comment…"][contenteditable="true"][role="textbox"]"#,
        ))
        .editable(Matcher::css(r#"textarea[aria-label*="comment"]"#))
        .editable(Matcher::role("textbox"))
        .editable(Matcher::css(r#"textarea[placeholder*="comment"]"#));

    let comment_submit = SelectorChain::new()
        .enabled(Matcher::css(r#"div[aria-label="Post"]"#))
        .enabled(Matcher::css(r#"div[aria-label="Comment"]"#))
        .enabled(Matcher::css_text(r#"div[role="button"]"#, "Post"))
        .enabled(Matcher::css_text(r#"div[role="button"]"#, "Comment"));

    let description = SelectorChain::visible_css([
        r#"div[data-ad-preview="message"]"#,
        r#"div[data-ad-comet-preview="message"]"#,
        r#"div[role="article"] div[dir="auto"][style*="text-align"]"#,
    ]);

    PlatformProfile {
        platform: Platform::Facebook,
        origin: "https://www.facebook.com".to_string(),
        home_url: "https://www.facebook.com/".to_string(),
        session_cookie: "c_user".to_string(),
        login_markers: vec![
            "facebook.com/login".to_string(),
            "facebook.com/checkpoint".to_string(),
        ],
        landmarks: SelectorChain::visible_css([
            r#"div[aria-label="Your profile"]"#,
            r#"div[aria-label="Home"]"#,
            r#"div[aria-label="Create a post"]"#,
            r#"img[alt*="profile picture"]"#,
            r#"a[href*="/me/"]"#,
        ]),
        post: PostSelectors {
            liked,
            like_button,
            comment_box,
            comment_submit: Some(comment_submit),
            description,
        },
        inbox: InboxSelectors {
            root_url: "https://www.facebook.com/messages/t/".to_string(),
            thread_list: Some(Matcher::css(r#"div[aria-label="Chats"]"#)),
            thread_rows: SelectorChain::visible_css([
                r#"div[aria-label="Chats"] div[role="row"]"#,
                r#"div[role="navigation"] a[role="link"][href*="/messages/t/"]"#,
            ]),
            name: SelectorChain::visible_css([
                r#"span[dir="auto"] > span"#,
                r#"span[dir="auto"]"#,
            ]),
            preview: SelectorChain::visible_css([
                r#"div > span[dir="auto"] span:not([aria-hidden="true"])"#,
                r#"span[dir="auto"] + div span"#,
            ]),
            timestamp: SelectorChain::visible_css([r#"abbr"#, r#"span[aria-hidden="true"] + span"#]),
            unread_badge: SelectorChain::visible_css([
                r#"span[data-visualcompletion="ignore"] div[role="button"]"#,
                r#"div[aria-label="Mark as read"]"#,
            ])
            .visible(Matcher::css_text("span", "Unread message")),
            requests_tab: labelled(r#"a[role="link"], [role="tab"], a[href*="requests"]"#, REQUEST_TAB_LABELS),
            accept_button: labelled(r#"div[role="button"], button"#, ACCEPT_LABELS),
            message_input: SelectorChain::new()
                .editable(Matcher::css(r#"div[aria-label="Message"][contenteditable="true"]"#))
                .editable(Matcher::css(r#"div[aria-label="Üzenet"][contenteditable="true"]"#))
                .editable(Matcher::role("textbox")),
            send_button: Some(
                SelectorChain::new()
                    .enabled(Matcher::css(r#"div[aria-label="Press enter to send"]"#))
                    .enabled(Matcher::css(r#"div[aria-label="Send"]"#)),
            ),
        },
    }
}

fn instagram() -> PlatformProfile {
    let like_icon = r#"svg[aria-label="Tetszik"][width="24"], svg[aria-label="Like"][width="24"]"#;

    let liked = SelectorChain::visible_css([
        r#"svg[aria-label="Mégsem tetszik"][width="24"]"#,
        r#"svg[aria-label="Unlike"][width="24"]"#,
    ]);

    let like_button = SelectorChain::new()
        .visible(Matcher::closest(like_icon, r#"div[role="button"]"#))
        .visible(Matcher::closest(like_icon, "div.x1ypdohk"))
        .visible(Matcher::closest(like_icon, "span.x1qfufaz"))
        .visible(Matcher::css(like_icon));

    let comment_box = SelectorChain::new()
        .editable(Matcher::css(r#"textarea[aria-label*="Hozzászólás"]"#))
        .editable(Matcher::css(r#"textarea[aria-label*="Comment"]"#))
        .editable(Matcher::css(r#"textarea[placeholder*="Hozzászólás"]"#))
        .editable(Matcher::css(r#"textarea[placeholder*="Comment"]"#))
        .enabled(Matcher::css(r#"div[aria-label*="Hozzászólás"]"#))
        .enabled(Matcher::css(r#"div[aria-label*="Comment"]"#))
        .editable(Matcher::role("textbox"));

    let description = SelectorChain::visible_css([
        "article h1",
        r#"article ul li div > span[dir="auto"]"#,
        "main h1",
    ]);

    PlatformProfile {
        platform: Platform::Instagram,
        origin: "https://www.instagram.com".to_string(),
        home_url: "https://www.instagram.com/".to_string(),
        session_cookie: "ds_user_id".to_string(),
        login_markers: vec!["accounts/login".to_string(), "challenge".to_string()],
        landmarks: SelectorChain::visible_css([
            r#"svg[aria-label="New post"]"#,
            r#"svg[aria-label="Home"]"#,
            r#"a[href="/accounts/edit/"]"#,
            r#"img[alt*="profile picture"]"#,
        ]),
        post: PostSelectors {
            liked,
            like_button,
            comment_box,
            comment_submit: None,
            description,
        },
        inbox: InboxSelectors {
            root_url: "https://www.instagram.com/direct/inbox/".to_string(),
            thread_list: Some(Matcher::css(r#"div[aria-label="Thread list"]"#)),
            thread_rows: SelectorChain::visible_css([
                r#"div[aria-label="Thread list"] div[role="listitem"]"#,
                r#"div[aria-label="Thread list"] div[role="button"]"#,
                r#"a[href^="/direct/t/"]"#,
            ]),
            name: SelectorChain::visible_css([r#"span[title]"#, r#"span[dir="auto"] > span"#]),
            preview: SelectorChain::visible_css([
                r#"span[dir="auto"] + div span"#,
                r#"div > span[dir="auto"]:not([title])"#,
            ]),
            timestamp: SelectorChain::visible_css(["abbr", "time"]),
            unread_badge: SelectorChain::visible_css([r#"div[aria-label="Unread"]"#])
                .visible(Matcher::css_text("span", "Unread"))
                .visible(Matcher::css_text("span", "Olvasatlan")),
            requests_tab: labelled(r#"[role="tab"], a[href*="/direct/requests"], div[role="button"]"#, REQUEST_TAB_LABELS),
            accept_button: labelled(r#"div[role="button"], button"#, ACCEPT_LABELS),
            message_input: SelectorChain::new()
                .editable(Matcher::css(r#"div[aria-label="Message"][contenteditable="true"]"#))
                .editable(Matcher::css(r#"textarea[placeholder*="Message"]"#))
                .editable(Matcher::css(r#"div[aria-label="Üzenet"][contenteditable="true"]"#))
                .editable(Matcher::role("textbox")),
            send_button: Some(labelled(r#"div[role="button"], button"#, &["Send", "Küldés"])),
        },
    }
}
