//! Cross-cutting utilities.
//!
//! - [`fs`] - atomic write-then-rename file operations for the managed paths

pub mod fs;
