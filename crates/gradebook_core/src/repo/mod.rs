//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable snapshot contract used by the grade store.
//! - Isolate SQLite and JSON details from service orchestration.
//!
//! # Invariants
//! - Snapshots are written whole; partial writes are never visible.
//! - Read paths reject undecodable persisted state instead of masking it.

pub mod snapshot_repo;
