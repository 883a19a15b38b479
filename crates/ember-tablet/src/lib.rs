//! Tablet ownership table for Emberstore.
//!
//! A tablet is a contiguous range of the key-fingerprint space within a
//! table, assigned to this server in a particular state. The object
//! manager consults this table on every operation: keys outside any
//! owned tablet (or inside one that is not serving) are refused.

pub mod table;

pub use table::{Tablet, TabletError, TabletState, TabletTable};
