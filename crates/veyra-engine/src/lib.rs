pub mod action;
pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod generator;
pub mod inbox;
pub mod login;
pub mod pacing;
pub mod platform;
pub mod resolver;
pub mod workflow;

pub use veyra_common::protocol;

pub use action::{ActionOutcome, ActionProtocol};
pub use backend::{BackendError, BrowserSession, Page};
pub use error::EngineError;
pub use inbox::{InboxReconciler, ReconcileOutcome, ReconciliationRecord};
pub use platform::{Platform, PlatformProfile};
pub use resolver::ElementResolver;
pub use workflow::{PostInteractionWorkflow, PostReport};
