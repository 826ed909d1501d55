//! Domain model for grade tracking.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one persisted snapshot shape shared by storage and export.
//!
//! # Invariants
//! - Every grade is identified by a stable `GradeId`.
//! - Subjects are referenced by exact name.

pub mod grade;
