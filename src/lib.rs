//! recookie - copy browser cookies between domains
//!
//! This crate reads the cookies stored for an origin domain out of a
//! Chromium cookie database and re-writes them under a target domain, so
//! that a session established against one host can be reused against
//! another (typically a local development server).

pub mod cli;
pub mod cookie;
pub mod error;
pub mod exit_code;
pub mod logging;
pub mod output;
pub mod settings;
pub mod store;
pub mod sync;

pub use error::{RecookieError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
