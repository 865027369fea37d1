//! record layer for the VSS database reader
//!
//! this module decodes the heterogeneous binary records every VSS data file
//! is built from. The upper layers (item files, history reconstruction) use
//! this API and never touch raw bytes directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RecordFile                            │
//! │   (whole-file buffer, offset-keyed cache of typed records)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │   header    │       │   records   │       │  revision   │
//!  │  (framing)  │       │ (payloads)  │       │ (log entry) │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!         │                     │                     │
//!         └─────────────────────┼─────────────────────┘
//!                               │
//!                               ▼
//!                        ┌─────────────┐
//!                        │   reader    │
//!                        │ (cursor+crc)│
//!                        └─────────────┘
//! ```

mod error;
mod file;
mod header;
mod reader;
mod records;
mod revision;
mod types;

// Re-export public API
pub use error::{RecordError, RecordResult};
pub use file::{ParseRecord, RecordFile};
pub use header::RecordHeader;
pub use reader::{crc16_fold, crc32_vss, RecordReader};
pub use records::{
    BranchBacklinkRecord, CheckoutRecord, CommentRecord, DeltaOp, DeltaOpCode, DeltaRecord,
    ItemRecord, ProjectBacklinkRecord,
};
pub use revision::{RevisionAction, RevisionKind, RevisionRecord};
pub use types::{timestamp_to_datetime, zero_terminated, PhysicalName, Signature, VssName};
