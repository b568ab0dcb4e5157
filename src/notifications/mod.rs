//! Notifications module
//!
//! Provides:
//! - The review sink the evaluation reports into
//! - An in-memory sink collecting markdown, failures and warnings
//! - GitHub pull request comments

mod github;

pub use github::*;

/// Message channel of the host review pipeline
pub trait ReviewSink {
    /// Post a markdown document to the review surface
    fn markdown(&mut self, message: &str);
    /// Record a failure; failures accumulate and never abort the evaluation
    fn fail(&mut self, message: &str);
    fn warn(&mut self, message: &str);
}

/// Sink that keeps everything it receives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub markdowns: Vec<String>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ReviewSink for StatusReport {
    fn markdown(&mut self, message: &str) {
        self.markdowns.push(message.to_string());
    }

    fn fail(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!("{}", message);
        self.warnings.push(message.to_string());
    }
}
