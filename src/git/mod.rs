//! Git operations module
//!
//! Provides:
//! - Changed file detection for picking the classes to check

pub mod diff;

pub use diff::GitDiff;
