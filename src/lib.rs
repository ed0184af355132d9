//! # DriftKV
//!
//! A crash-safe key-value store with:
//! - Write-Ahead Logging (WAL): every mutation is logged before it is visible
//! - Batched writes with background and forced flushing
//! - Size-based segment rotation
//! - Crash recovery that truncates torn or corrupt tails
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Shell                               │
//! │                (SET / GET / DELETE / ...)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                │
//! │           (WAL append first, then HashMap)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         WAL                                 │
//! │   Record codec → Frame → Buffer → Flusher (tick / close)    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │   Segments    │
//!               │ wal-0001.log  │
//!               │ wal-0002.log  │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DriftError, Result};
pub use config::Config;
pub use store::Store;
pub use wal::{Operation, Record, Wal};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DriftKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
