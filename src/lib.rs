//! sourcesafe - a reader for legacy Visual SourceSafe databases
//!
//! This crate decodes a VSS database directory tree and reconstructs a
//! coherent, chronologically ordered history of its projects and files,
//! including per-revision content for files via reverse delta
//! reconstruction. The intended consumer is a migration pipeline feeding a
//! modern version-control system, plus the `vssdump` binary for forensic
//! inspection.
//!
//! # Example
//!
//! ```no_run
//! use sourcesafe::db::Database;
//! use sourcesafe::history::ChangesetHistory;
//!
//! let db = Database::open("./vss_db").unwrap();
//! let root = db.open_root_project(true).unwrap();
//! let history = ChangesetHistory::build(&db, &root).unwrap();
//! for changeset in history.changesets() {
//!     println!("{} by {}", changeset.timestamp, changeset.author);
//! }
//! ```

#![allow(dead_code)] // Many accessors are for downstream migration tooling

pub mod db;
pub mod dump;
pub mod encoding;
pub mod history;
pub mod item;
pub mod names;
pub mod record;
