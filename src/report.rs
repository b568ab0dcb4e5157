//! Coverage evaluation and markdown summary
//!
//! One evaluation resolves the changed files to classes, scans the JaCoCo
//! report once, resolves a requirement per class and posts a single markdown
//! table. Threshold misses are raised on the sink and accumulate.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::artifacts::{report_link, FailureArtifact};
use crate::classes::{ClassFileMap, ClassResolver};
use crate::config::{Config, TextConfig};
use crate::coverage::{
    parse_jacoco_reader, ClassCoverage, ProjectCoverage, RequiredCoverage, ThresholdConfig,
    ThresholdResolver, Tier, UNKNOWN_TIER_EMOJI,
};
use crate::error::{CoverageError, Result};
use crate::notifications::ReviewSink;

/// Shown in the covered column when a class has no usable counter
pub const NO_DATA: &str = "no data";

/// Outcome for one class of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ClassResult {
    pub name: String,
    pub file_path: String,
    /// Floored percentage, `None` when the report has no usable counter
    pub covered: Option<u32>,
    pub required: RequiredCoverage,
}

impl ClassResult {
    pub fn tier(&self) -> Option<Tier> {
        self.covered
            .map(|covered| Tier::of(covered as f64, self.required.percent.value()))
    }

    /// Classes without data cannot meet a requirement
    pub fn passed(&self) -> bool {
        self.covered
            .map(|covered| covered as f64 >= self.required.percent.value())
            .unwrap_or(false)
    }

    fn markdown_row(&self, report_url: &str) -> String {
        let covered = match self.covered {
            Some(covered) => format!("{}%", covered),
            None => NO_DATA.to_string(),
        };
        let status = self.tier().map(|t| t.emoji()).unwrap_or(UNKNOWN_TIER_EMOJI);
        format!(
            "| {} | {} | {}% | {} |\n",
            report_link(&self.name, report_url),
            covered,
            self.required.percent,
            status
        )
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub project: ProjectCoverage,
    pub project_tier: Tier,
    pub project_passed: bool,
    /// In class map order
    pub classes: Vec<ClassResult>,
    pub classes_passed: bool,
    pub markdown: String,
    /// Set when the failure artifact was written
    pub failure_artifact: Option<PathBuf>,
}

impl Evaluation {
    pub fn passed(&self) -> bool {
        self.project_passed && self.classes_passed
    }
}

/// Entry point of a coverage evaluation
pub struct CoverageGate<'a> {
    config: &'a Config,
    thresholds: ThresholdConfig,
    resolver: ClassResolver,
}

impl<'a> CoverageGate<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let resolver = ClassResolver::new(
            &config.files.extensions,
            &config.report.delimiter,
            &config.report.root,
        )?;

        Ok(Self {
            config,
            thresholds: config.thresholds()?,
            resolver,
        })
    }

    pub fn classes(&self, files: &[String]) -> ClassFileMap {
        self.resolver.resolve(files)
    }

    /// Evaluate against the report at `config.report.path`
    pub fn evaluate<S: ReviewSink>(&self, files: &[String], sink: &mut S) -> Result<Evaluation> {
        let file = File::open(&self.config.report.path)?;
        self.evaluate_reader(BufReader::new(file), files, sink)
    }

    pub fn evaluate_reader<R: BufRead, S: ReviewSink>(
        &self,
        report: R,
        files: &[String],
        sink: &mut S,
    ) -> Result<Evaluation> {
        let class_map = self.classes(files);
        let report = parse_jacoco_reader(report, &class_map.class_names())?;

        let project = report.project_coverage()?;
        let project_tier = Tier::of(project.covered.value(), self.thresholds.project.value());
        let project_passed = project.covered.value() >= self.thresholds.project.value();

        let found: HashMap<&str, &ClassCoverage> = report
            .classes
            .iter()
            .map(|class| (class.name.as_str(), class))
            .collect();
        let classes = self.evaluate_classes(&class_map, &found, sink);
        let classes_passed = classes.iter().all(ClassResult::passed);

        let markdown = render_markdown(
            &self.config.text,
            &project,
            project_tier,
            &classes,
            classes_passed,
            &self.config.report.url,
        );
        sink.markdown(&markdown);

        let failure_artifact =
            self.report_failures(&project, project_passed, classes_passed, &classes, sink)?;

        Ok(Evaluation {
            project,
            project_tier,
            project_passed,
            classes,
            classes_passed,
            markdown,
            failure_artifact,
        })
    }

    fn evaluate_classes<S: ReviewSink>(
        &self,
        class_map: &ClassFileMap,
        found: &HashMap<&str, &ClassCoverage>,
        sink: &mut S,
    ) -> Vec<ClassResult> {
        let resolver = ThresholdResolver::new(&self.thresholds, &self.config.report.root);
        let mut results = Vec::new();

        for (name, file_path) in class_map.iter() {
            let Some(class) = found.get(name) else {
                tracing::debug!("{} is not in the coverage report", name);
                continue;
            };

            let covered = match class.covered_percentage() {
                Ok(covered) => Some(covered),
                Err(e) => {
                    if self.config.report.fail_no_coverage_data_found {
                        sink.fail(&e.to_string());
                    } else {
                        sink.warn(&e.to_string());
                    }
                    None
                }
            };

            results.push(ClassResult {
                name: name.to_string(),
                file_path: file_path.to_string(),
                covered,
                required: resolver.required(name, file_path),
            });
        }

        results
    }

    fn report_failures<S: ReviewSink>(
        &self,
        project: &ProjectCoverage,
        project_passed: bool,
        classes_passed: bool,
        classes: &[ClassResult],
        sink: &mut S,
    ) -> Result<Option<PathBuf>> {
        if !project_passed {
            let miss = CoverageError::ProjectThresholdMiss {
                covered: project.covered,
                minimum: self.thresholds.project,
            };
            sink.fail(&miss.to_string());
        }

        if !classes_passed {
            let miss = CoverageError::ClassThresholdMiss {
                minimum: self.thresholds.class_default,
            };
            sink.fail(&miss.to_string());
        }

        if project_passed && classes_passed {
            return Ok(None);
        }

        let path = self.config.output.failure_file.clone();
        FailureArtifact::new(
            classes.iter().map(|c| c.name.as_str()),
            &self.config.report.url,
        )
        .save(&path)?;

        Ok(Some(path))
    }
}

/// Title line, subtitle, then one table row per class
pub fn render_markdown(
    text: &TextConfig,
    project: &ProjectCoverage,
    project_tier: Tier,
    classes: &[ClassResult],
    classes_passed: bool,
    report_url: &str,
) -> String {
    let subtitle = if classes_passed {
        &text.subtitle_success
    } else {
        &text.subtitle_failure
    };

    let mut markdown = format!(
        "### {} Code Coverage {}% {}\n",
        text.title,
        project.covered,
        project_tier.emoji()
    );
    markdown.push_str(&format!("#### {}\n", subtitle));
    markdown.push_str(&format!(
        "| {} | Covered | Required | Status |\n",
        text.class_column
    ));
    markdown.push_str("|:---|:---:|:---:|:---:|\n");

    for class in classes {
        markdown.push_str(&class.markdown_row(report_url));
    }

    markdown
}
