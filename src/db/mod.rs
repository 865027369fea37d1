//! High-level database API.
//!
//! This module provides the user-facing handle over a VSS directory tree:
//! configuration, the srcsafe.ini loader, path mapping, and the item-file
//! caches.

mod database;
mod ini;

pub use database::{Database, DatabaseConfig, VssError, VssResult};
pub use ini::SimpleIni;
