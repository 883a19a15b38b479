//! Object manager for Emberstore.
//!
//! The object manager is the state-management core of a primary-copy,
//! log-structured, in-memory key-value server. It binds three otherwise
//! independent collaborators (the append-only log in `ember-log`, the
//! bucket-locked hash index in `ember-index`, and the tablet ownership
//! table in `ember-tablet`) into linearizable single-key reads, writes,
//! and removes, and rebuilds live state from replayed log segments
//! during recovery and migration.
//!
//! # Architecture Overview
//!
//! ```text
//!            service layer
//!                 │
//!        ┌────────▼─────────┐   bucket lock per operation
//!        │  ObjectManager   │──────────────┐
//!        └──┬─────────┬─────┘              │
//!           │         │                ┌───▼───────┐
//!     ┌─────▼───┐ ┌───▼────────┐       │ HashIndex │
//!     │ TabletT.│ │    Log     │◄──────┤ (refs)    │
//!     │ (owner) │ │ (entries)  │ deref └───────────┘
//!     └─────────┘ └───┬────────┘
//!                     │ cleaner callbacks (CleanupSink)
//!                     └──────────► back into ObjectManager
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod reject;
pub mod sweeper;

pub use config::StoreConfig;
pub use error::StoreError;
pub use manager::ObjectManager;
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use reject::RejectRules;
pub use sweeper::{SweepOutcome, TombstoneSweeper};
