//! Domain model for weekly habits, daily progress and diary entries.
//!
//! # Responsibility
//! - Define the plain data records the stores own and persist.
//! - Keep validation next to the types it protects.
//!
//! # Invariants
//! - Every record is identified by a stable, non-nil `Uuid`.
//! - Nothing in this model is ever deleted.
//! - Status is derived, never stored.

pub mod diary;
pub mod habit;
pub mod progress;
