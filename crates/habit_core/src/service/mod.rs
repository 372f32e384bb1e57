//! Stores exposing the habit and diary use-cases.
//!
//! # Responsibility
//! - Own in-memory bucketed indices loaded from repositories.
//! - Keep callers decoupled from storage details.

pub mod diary_store;
pub mod habit_store;
