//! JaCoCo XML report ingestion
//!
//! The report is read event by event; only the classes that were asked for
//! accumulate counters, and the project INSTRUCTION counter is always kept.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{ClassCoverage, CounterKind, CoverageCounter, ProjectCoverage};
use crate::error::{CoverageError, Result};

/// Result of scanning a JaCoCo report
#[derive(Debug, Clone, Default)]
pub struct JacocoReport {
    /// Requested classes found in the report, in report order
    pub classes: Vec<ClassCoverage>,
    /// `<counter type="INSTRUCTION">` directly under `<report>`
    pub project_instructions: Option<CoverageCounter>,
}

impl JacocoReport {
    pub fn class(&self, name: &str) -> Option<&ClassCoverage> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn project_coverage(&self) -> Result<ProjectCoverage> {
        let counter = self
            .project_instructions
            .ok_or(CoverageError::MissingProjectCounter)?;
        ProjectCoverage::from_counter(counter)
    }
}

/// Parse a JaCoCo XML file, keeping counters for the `wanted` classes only
pub fn parse_jacoco(path: &Path, wanted: &HashSet<String>) -> Result<JacocoReport> {
    let file = File::open(path)?;
    parse_jacoco_reader(BufReader::new(file), wanted)
}

/// Parse JaCoCo XML content from a string
pub fn parse_jacoco_string(content: &str, wanted: &HashSet<String>) -> Result<JacocoReport> {
    parse_jacoco_reader(content.as_bytes(), wanted)
}

/// Parse JaCoCo XML from any buffered reader without loading the whole document
pub fn parse_jacoco_reader<R: BufRead>(input: R, wanted: &HashSet<String>) -> Result<JacocoReport> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut scan = ReportScan::new(wanted);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                scan.open(e, false);
                scan.stack.push(e.name().as_ref().to_vec());
            }
            Ok(Event::Empty(ref e)) => scan.open(e, true),
            Ok(Event::End(ref e)) => {
                scan.stack.pop();
                if e.name().as_ref() == b"class" {
                    scan.close_class();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CoverageError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!(
        requested = wanted.len(),
        found = scan.report.classes.len(),
        "scanned JaCoCo report"
    );

    Ok(scan.report)
}

struct ReportScan<'a> {
    wanted: &'a HashSet<String>,
    stack: Vec<Vec<u8>>,
    current: Option<ClassCoverage>,
    seen: HashSet<String>,
    report: JacocoReport,
}

impl<'a> ReportScan<'a> {
    fn new(wanted: &'a HashSet<String>) -> Self {
        Self {
            wanted,
            stack: Vec::new(),
            current: None,
            seen: HashSet::new(),
            report: JacocoReport::default(),
        }
    }

    fn open(&mut self, e: &BytesStart, self_closing: bool) {
        match e.name().as_ref() {
            b"class" => {
                let Some(name) = attribute(e, b"name") else {
                    return;
                };
                if self.wanted.contains(&name) && self.seen.insert(name.clone()) {
                    self.current = Some(ClassCoverage::new(name));
                    if self_closing {
                        self.close_class();
                    }
                }
            }
            b"counter" => {
                let Some(counter) = parse_counter(e) else {
                    return;
                };
                let parent = self.stack.last().cloned();
                match parent.as_deref() {
                    Some(b"class") => {
                        if let Some(ref mut class) = self.current {
                            class.add_counter(counter);
                        }
                    }
                    Some(b"report") => {
                        if counter.kind == CounterKind::Instruction
                            && self.report.project_instructions.is_none()
                        {
                            self.report.project_instructions = Some(counter);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn close_class(&mut self) {
        if let Some(class) = self.current.take() {
            self.report.classes.push(class);
        }
    }
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn parse_counter(e: &BytesStart) -> Option<CoverageCounter> {
    let kind = match attribute(e, b"type")?.parse::<CounterKind>() {
        Ok(kind) => kind,
        Err(message) => {
            tracing::debug!("skipping counter: {}", message);
            return None;
        }
    };
    let covered = attribute(e, b"covered")?.parse::<u64>().ok()?;
    let missed = attribute(e, b"missed")?.parse::<u64>().ok()?;

    Some(CoverageCounter {
        kind,
        covered,
        missed,
    })
}
