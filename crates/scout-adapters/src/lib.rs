//! Outbound adapters: SQLite persistence and the on-disk artifact store.

pub mod persistence;
pub mod storage;
