//! Persistence layer for the engine stores
//!
//! Reports, combo counters, recovery votes, and prone-alert records each
//! get a small query module over the shared SQLite pool. Mutations return
//! the affected values so callers can emit bus events without re-reading.

pub mod combos;
pub mod prone;
pub mod reports;
pub mod votes;
