//! # pollsafe
//!
//! Embedded storage for a self-hosted poll service:
//! - Opaque poll configuration plus append-only answer rows per poll
//! - Bounded in-memory working set with least-recently-used eviction
//! - One file per poll, periodic full sync, flush on shutdown
//! - Soft delete with garbage collection of deleted polls
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Poll request handlers                       │
//! │                   (many threads)                             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  DataSafe trait
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      FileSafe                                │
//! │              (one mutex, all operations)                     │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//!  ┌───────────┐        ┌──────────────┐        ┌─────────────┐
//!  │  Ident    │        │ RecordTable  │◄───────│   Worker    │
//!  │ sanitizer │        │  (hot set)   │        │ clear/sync/ │
//!  └───────────┘        └──────┬───────┘        │  shutdown   │
//!                              │                └─────────────┘
//!                              ▼
//!                       ┌─────────────┐        ┌─────────────┐
//!                       │    Codec    │◄───────│     GC      │
//!                       │ (file/poll) │        │             │
//!                       └─────────────┘        └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod ident;
pub mod record;
pub mod codec;
pub mod table;
pub mod worker;
pub mod gc;
pub mod safe;
pub mod registry;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SafeError};
pub use config::{SafeConfig, ServiceConfig};
pub use gc::GcReport;
pub use record::{Answer, PollRecord, PollResults, SingleResult};
pub use registry::Registry;
pub use safe::{DataSafe, FileSafe};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pollsafe
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
