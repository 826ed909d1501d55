//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, statistics and persistence into store APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod grade_store;
pub mod simulator;
