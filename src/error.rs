//! Error taxonomy for coverage evaluation
//!
//! The `Display` text of the escalated conditions is the exact message shown
//! in the review surface.

use std::io;

use thiserror::Error;

use crate::coverage::Percent;

#[derive(Debug, Error)]
pub enum CoverageError {
    /// A requested class has no INSTRUCTION, BRANCH or LINE counter.
    #[error("No coverage data found for {0}")]
    NoCoverageDataFound(String),

    #[error("Total coverage of {covered}%. Improve this to at least {minimum}%")]
    ProjectThresholdMiss { covered: Percent, minimum: Percent },

    /// `minimum` is the global class default, not the per-class requirement.
    #[error("Class coverage is below minimum. Improve to at least {minimum}%")]
    ClassThresholdMiss { minimum: Percent },

    #[error("coverage report has zero instructions in its project INSTRUCTION counter")]
    ZeroInstructionsTotal,

    #[error("coverage report has no project-level INSTRUCTION counter")]
    MissingProjectCounter,

    #[error("invalid threshold pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("error parsing JaCoCo XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to write failure artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = CoverageError> = std::result::Result<T, E>;
