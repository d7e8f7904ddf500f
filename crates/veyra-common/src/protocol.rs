use serde::{Deserialize, Serialize};
use std::fmt;

/// How a candidate locates a node. A closed set: page text is only ever
/// passed as a parameter, never spliced into a query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    /// Plain CSS selector.
    Css { selector: String },
    /// Element matching `selector` whose rendered text contains `text`.
    CssText { selector: String, text: String },
    /// Nearest `ancestor` of the first element matching `inner`.
    Closest { inner: String, ancestor: String },
    /// ARIA role, optionally narrowed by an accessible-name substring.
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Matcher {
    pub fn css(selector: impl Into<String>) -> Self {
        Matcher::Css {
            selector: selector.into(),
        }
    }

    pub fn css_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Matcher::CssText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn closest(inner: impl Into<String>, ancestor: impl Into<String>) -> Self {
        Matcher::Closest {
            inner: inner.into(),
            ancestor: ancestor.into(),
        }
    }

    pub fn role(role: impl Into<String>) -> Self {
        Matcher::Role {
            role: role.into(),
            name: None,
        }
    }

    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Matcher::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Css { selector } => write!(f, "{}", selector),
            Matcher::CssText { selector, text } => write!(f, "{} ~ \"{}\"", selector, text),
            Matcher::Closest { inner, ancestor } => write!(f, "{} ^ {}", inner, ancestor),
            Matcher::Role { role, name: None } => write!(f, "role={}", role),
            Matcher::Role {
                role,
                name: Some(name),
            } => write!(f, "role={} \"{}\"", role, name),
        }
    }
}

/// State a node must reach before a candidate counts as matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredState {
    #[default]
    Visible,
    /// Visible and accepts text input.
    Editable,
    /// Visible and not disabled.
    Enabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorCandidate {
    pub matcher: Matcher,
    #[serde(default)]
    pub required_state: RequiredState,
}

impl SelectorCandidate {
    pub fn new(matcher: Matcher, required_state: RequiredState) -> Self {
        Self {
            matcher,
            required_state,
        }
    }
}

/// Ordered fallback list for one logical UI capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain {
    candidates: Vec<SelectorCandidate>,
}

impl SelectorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(mut self, matcher: Matcher, required_state: RequiredState) -> Self {
        self.candidates
            .push(SelectorCandidate::new(matcher, required_state));
        self
    }

    pub fn visible(self, matcher: Matcher) -> Self {
        self.candidate(matcher, RequiredState::Visible)
    }

    pub fn editable(self, matcher: Matcher) -> Self {
        self.candidate(matcher, RequiredState::Editable)
    }

    pub fn enabled(self, matcher: Matcher) -> Self {
        self.candidate(matcher, RequiredState::Enabled)
    }

    /// Shorthand for a chain of visible CSS selectors.
    pub fn visible_css<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        selectors
            .into_iter()
            .fold(Self::new(), |chain, s| chain.visible(Matcher::css(s)))
    }

    pub fn candidates(&self) -> &[SelectorCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl FromIterator<SelectorCandidate> for SelectorChain {
    fn from_iter<T: IntoIterator<Item = SelectorCandidate>>(iter: T) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

/// Opaque reference to a live node, valid only for the page generation that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    pub generation: u64,
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.generation)
    }
}

/// A handle together with the matcher that found it, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub handle: ElementHandle,
    pub matcher: Matcher,
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}
