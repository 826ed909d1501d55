//! Flutter-facing bridge over `gradebook_core`.

pub mod api;
