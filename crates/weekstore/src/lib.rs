//! # weekstore
//!
//! Private on-device storage used by lifeweeks.
//!
//! ## Layout
//! - **SettingsStore**: small key-value file (`settings.wkv`) holding the
//!   render-cache timestamp and application preferences
//! - **SlotStore**: directory of fixed-name files (the rendered life table)
//!   replaced atomically on every write
//!
//! Single writer, any number of readers. Every mutation reaches disk before
//! the call returns.

#![warn(missing_docs)]

mod error;
mod parser;
mod settings;
mod slot;

pub use error::{Error, Result};
pub use settings::{SettingsStore, SETTINGS_FILE};
pub use slot::SlotStore;
