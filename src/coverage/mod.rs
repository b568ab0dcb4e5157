//! Coverage module
//!
//! Provides:
//! - JaCoCo XML streaming ingestion
//! - Threshold resolution and status tiers

mod jacoco;
mod threshold;

pub use jacoco::*;
pub use threshold::*;

use std::fmt;
use std::str::FromStr;

use crate::error::{CoverageError, Result};

/// Coverage dimension reported by JaCoCo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Instruction,
    Branch,
    Line,
    Complexity,
    Method,
    Class,
}

impl FromStr for CounterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INSTRUCTION" => Ok(CounterKind::Instruction),
            "BRANCH" => Ok(CounterKind::Branch),
            "LINE" => Ok(CounterKind::Line),
            "COMPLEXITY" => Ok(CounterKind::Complexity),
            "METHOD" => Ok(CounterKind::Method),
            "CLASS" => Ok(CounterKind::Class),
            other => Err(format!("unknown counter type: {}", other)),
        }
    }
}

/// Kinds usable for class coverage, in order of preference
pub const CLASS_COUNTER_PRIORITY: [CounterKind; 3] =
    [CounterKind::Instruction, CounterKind::Branch, CounterKind::Line];

/// One covered/missed pair for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageCounter {
    pub kind: CounterKind,
    pub covered: u64,
    pub missed: u64,
}

impl CoverageCounter {
    pub fn total(&self) -> u64 {
        self.covered + self.missed
    }
}

/// Counters of a single class scope, at most one per kind
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCoverage {
    /// Slash-delimited, package-qualified class name
    pub name: String,
    counters: Vec<CoverageCounter>,
}

impl ClassCoverage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counters: Vec::new(),
        }
    }

    /// Record a counter; a later counter of an already seen kind is ignored.
    pub fn add_counter(&mut self, counter: CoverageCounter) {
        if self.counter(counter.kind).is_none() {
            self.counters.push(counter);
        }
    }

    pub fn counter(&self, kind: CounterKind) -> Option<&CoverageCounter> {
        self.counters.iter().find(|c| c.kind == kind)
    }

    pub fn counters(&self) -> &[CoverageCounter] {
        &self.counters
    }

    /// INSTRUCTION, else BRANCH, else LINE
    pub fn selected_counter(&self) -> Option<&CoverageCounter> {
        CLASS_COUNTER_PRIORITY
            .iter()
            .find_map(|kind| self.counter(*kind))
    }

    /// Covered percentage of the selected counter, floored.
    pub fn covered_percentage(&self) -> Result<u32> {
        match self.selected_counter() {
            Some(counter) if counter.total() > 0 => {
                Ok((counter.covered * 100 / counter.total()) as u32)
            }
            _ => Err(CoverageError::NoCoverageDataFound(self.name.clone())),
        }
    }
}

/// Project-wide instruction coverage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectCoverage {
    pub counter: CoverageCounter,
    /// Rounded to two decimals
    pub covered: Percent,
}

impl ProjectCoverage {
    pub fn from_counter(counter: CoverageCounter) -> Result<Self> {
        if counter.total() == 0 {
            return Err(CoverageError::ZeroInstructionsTotal);
        }
        let raw = counter.covered as f64 * 100.0 / counter.total() as f64;
        Ok(Self {
            counter,
            covered: Percent((raw * 100.0).round() / 100.0),
        })
    }
}

/// A percentage rendered without trailing zeros (`50`, `32.9`, `12.35`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Percent(pub f64);

impl Percent {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<u32> for Percent {
    fn from(value: u32) -> Self {
        Percent(value as f64)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = format!("{:.2}", self.0);
        f.write_str(fixed.trim_end_matches('0').trim_end_matches('.'))
    }
}
