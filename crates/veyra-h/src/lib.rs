//! Chromium backend for the veyra engine, driven over CDP.

pub mod backend;
pub mod cdp;
mod inject;

pub use backend::{CdpPage, HeadlessSession};
