//! glamlens - mod classification and resolution for character designs
//!
//! This crate answers two questions about the mods installed in an external
//! modding framework:
//! - What is a mod? Changed-item identifiers are classified into equipment
//!   slots, customization parts, races and content types.
//! - Which mods are affecting the player right now? Resource trees, resolved
//!   paths and mod priorities are combined into a best-effort answer.
//!
//! It also keeps a category cache in sync with mod lifecycle events and
//! detects conflicts between mods selected for a design.

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod config;
pub mod db;
pub mod designs;
pub mod lifecycle;
pub mod mods;
pub mod options;
pub mod provider;
pub mod resolve;

pub use app::Engine;
pub use config::Config;
