use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    #[serde(default = "default_min_delay_sec")]
    pub min_delay_sec: u64,
    #[serde(default = "default_max_delay_sec")]
    pub max_delay_sec: u64,
    #[serde(default = "default_comment_pool")]
    pub comment_pool: Vec<String>,
    /// Persistent browser profile. Defaults to `./user_data/<agent_name>`.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: PathBuf,
    #[serde(default)]
    pub comment_source: CommentSource,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub inbox: InboxConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            min_delay_sec: default_min_delay_sec(),
            max_delay_sec: default_max_delay_sec(),
            comment_pool: default_comment_pool(),
            profile_dir: None,
            diagnostics_dir: default_diagnostics_dir(),
            comment_source: CommentSource::default(),
            timeouts: TimeoutConfig::default(),
            inbox: InboxConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./user_data").join(&self.agent_name))
    }

    pub fn session_file(&self) -> PathBuf {
        self.profile_dir().join("session_storage.json")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_sec > self.max_delay_sec {
            return Err(ConfigError::Invalid(format!(
                "min_delay_sec ({}) is greater than max_delay_sec ({})",
                self.min_delay_sec, self.max_delay_sec
            )));
        }
        if self.comment_pool.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "comment_pool must contain at least one non-empty comment".into(),
            ));
        }
        if self.agent_name.trim().is_empty() {
            return Err(ConfigError::Invalid("agent_name must not be empty".into()));
        }
        Ok(())
    }
}

fn default_agent_name() -> String {
    "agent_1".to_string()
}

fn default_min_delay_sec() -> u64 {
    30
}

fn default_max_delay_sec() -> u64 {
    60
}

fn default_comment_pool() -> Vec<String> {
    vec![
        "🔥🔥🔥".to_string(),
        "Love this!".to_string(),
        "Amazing post!".to_string(),
        "💯".to_string(),
        "So good!".to_string(),
    ]
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Where post comments come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSource {
    #[default]
    Pool,
    Generator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    /// Pause after a navigation before inspecting the page.
    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,
    #[serde(default = "default_candidate_ms")]
    pub candidate_ms: u64,
    #[serde(default = "default_precheck_ms")]
    pub precheck_ms: u64,
    /// Single confirm timeout shared by every act-then-confirm call.
    #[serde(default = "default_confirm_ms")]
    pub confirm_ms: u64,
    #[serde(default = "default_submit_ms")]
    pub submit_ms: u64,
    #[serde(default = "default_landmark_ms")]
    pub landmark_ms: u64,
    #[serde(default = "default_login_poll_ms")]
    pub login_poll_ms: u64,
    #[serde(default = "default_scan_field_ms")]
    pub scan_field_ms: u64,
    #[serde(default = "default_relocate_ms")]
    pub relocate_ms: u64,
    #[serde(default = "default_item_ms")]
    pub item_ms: u64,
    #[serde(default = "default_key_delay_ms")]
    pub key_delay_ms: u64,
    #[serde(default = "default_click_settle_ms")]
    pub click_settle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            page_settle_ms: default_page_settle_ms(),
            candidate_ms: default_candidate_ms(),
            precheck_ms: default_precheck_ms(),
            confirm_ms: default_confirm_ms(),
            submit_ms: default_submit_ms(),
            landmark_ms: default_landmark_ms(),
            login_poll_ms: default_login_poll_ms(),
            scan_field_ms: default_scan_field_ms(),
            relocate_ms: default_relocate_ms(),
            item_ms: default_item_ms(),
            key_delay_ms: default_key_delay_ms(),
            click_settle_ms: default_click_settle_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }
    pub fn candidate(&self) -> Duration {
        Duration::from_millis(self.candidate_ms)
    }
    pub fn precheck(&self) -> Duration {
        Duration::from_millis(self.precheck_ms)
    }
    pub fn confirm(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }
    pub fn submit(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }
    pub fn landmark(&self) -> Duration {
        Duration::from_millis(self.landmark_ms)
    }
    pub fn login_poll(&self) -> Duration {
        Duration::from_millis(self.login_poll_ms)
    }
    pub fn scan_field(&self) -> Duration {
        Duration::from_millis(self.scan_field_ms)
    }
    pub fn relocate(&self) -> Duration {
        Duration::from_millis(self.relocate_ms)
    }
    pub fn item(&self) -> Duration {
        Duration::from_millis(self.item_ms)
    }
    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }
    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }
}

fn default_navigation_ms() -> u64 {
    60000
}

fn default_page_settle_ms() -> u64 {
    3000
}

fn default_candidate_ms() -> u64 {
    5000
}

fn default_precheck_ms() -> u64 {
    3000
}

fn default_confirm_ms() -> u64 {
    5000
}

fn default_submit_ms() -> u64 {
    2000
}

fn default_landmark_ms() -> u64 {
    3000
}

fn default_login_poll_ms() -> u64 {
    5000
}

fn default_scan_field_ms() -> u64 {
    300
}

fn default_relocate_ms() -> u64 {
    10000
}

fn default_item_ms() -> u64 {
    120000
}

fn default_key_delay_ms() -> u64 {
    100
}

fn default_click_settle_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    /// Scroll passes over the thread list to surface virtualized rows.
    #[serde(default = "default_scroll_iterations")]
    pub scroll_iterations: usize,
    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: i64,
    #[serde(default = "default_include_requests")]
    pub include_requests: bool,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            scroll_iterations: default_scroll_iterations(),
            scroll_step_px: default_scroll_step_px(),
            include_requests: default_include_requests(),
        }
    }
}

fn default_scroll_iterations() -> usize {
    3
}

fn default_scroll_step_px() -> i64 {
    1200
}

fn default_include_requests() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    #[default]
    Pool,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub kind: GeneratorKind,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_generator_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_fallback_comment")]
    pub fallback_comment: String,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_generator_timeout_ms(),
            max_chars: default_max_chars(),
            fallback_comment: default_fallback_comment(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_api_key_env() -> String {
    "VEYRA_API_KEY".to_string()
}

fn default_generator_timeout_ms() -> u64 {
    15000
}

fn default_max_chars() -> usize {
    280
}

fn default_fallback_comment() -> String {
    "Love this!".to_string()
}

fn default_fallback_reply() -> String {
    "Thanks for reaching out! I'll get back to you soon.".to_string()
}
