//! jacoco-gate - coverage gate for code review
//!
//! Evaluates the classes touched by a change against a JaCoCo XML report:
//! - Changed source files are mapped to class identifiers
//! - Every class gets a required percentage from layered thresholds
//! - One markdown table summarizes the project and class results
//! - Misses are raised on a review sink and recorded in a JSON artifact

pub mod artifacts;
pub mod classes;
pub mod config;
pub mod coverage;
pub mod error;
pub mod git;
pub mod notifications;
pub mod report;

pub use classes::{ClassFileMap, ClassResolver};
pub use config::Config;
pub use coverage::{parse_jacoco, JacocoReport, Percent, ThresholdResolver, Tier};
pub use error::{CoverageError, Result};
pub use notifications::{ReviewSink, StatusReport};
pub use report::{ClassResult, CoverageGate, Evaluation};
