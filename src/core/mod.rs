//! Core types shared across the crate.
//!
//! Currently this is the error layer: the typed [`ReplugError`] kinds, the
//! user-facing [`ErrorContext`] wrapper, and the [`user_friendly_error`]
//! conversion used at the CLI boundary.

pub mod error;

pub use error::{ErrorContext, ReplugError, user_friendly_error};
