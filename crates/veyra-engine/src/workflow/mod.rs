pub mod manual;
pub mod post;

pub use manual::manual_login;
pub use post::{PostInteractionWorkflow, PostReport};
