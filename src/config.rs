use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classes::{DEFAULT_DELIMITER, DEFAULT_EXTENSIONS};
use crate::coverage::{ClassMatcher, Percent, ThresholdConfig};
use crate::error::CoverageError;

pub const DEFAULT_FAILURE_FILE: &str = "danger_jacoco_failure_status_file.json";
pub const DEFAULT_REPORT_PATH: &str = "build/reports/jacoco/test/jacocoTestReport.xml";

/// Characters that never occur in a slash-delimited JVM class name; `$` does.
const REGEX_SYNTAX: &[char] = &[
    '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '\\',
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub report: ReportConfig,
    pub files: FilesConfig,
    pub thresholds: ThresholdSettings,
    pub text: TextConfig,
    pub output: OutputConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: PathBuf,
    /// Base URL of the hosted HTML report; empty disables links
    pub url: String,
    /// Regex separating the source root from the package path
    pub delimiter: String,
    /// Raise a failure (not just a warning) for classes without counters
    pub fail_no_coverage_data_found: bool,
    /// Directory that source paths are relative to
    pub root: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REPORT_PATH),
            url: String::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            fail_no_coverage_data_found: true,
            root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub extensions: Vec<String>,
    /// Glob patterns for files to check in addition to changed files
    pub include: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub project: f64,
    pub class: f64,
    pub composable_class: f64,
    pub packages: HashMap<String, f64>,
    pub classes: Vec<ClassThreshold>,
}

/// One `[[thresholds.classes]]` entry; exactly one of `name` and `pattern`
#[derive(Debug, Clone, Deserialize)]
pub struct ClassThreshold {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub minimum: f64,
}

impl ClassThreshold {
    fn matcher(&self) -> Result<ClassMatcher, CoverageError> {
        match (&self.name, &self.pattern) {
            (Some(name), None) if name.contains(REGEX_SYNTAX) => {
                Err(CoverageError::InvalidConfig(format!(
                    "class name '{}' looks like a regex, use 'pattern' instead of 'name'",
                    name
                )))
            }
            (Some(name), None) => Ok(ClassMatcher::Literal(name.clone())),
            (None, Some(pattern)) => ClassMatcher::pattern(pattern),
            _ => Err(CoverageError::InvalidConfig(
                "each [[thresholds.classes]] entry needs exactly one of 'name' or 'pattern'"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub title: String,
    pub class_column: String,
    pub subtitle_success: String,
    pub subtitle_failure: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            title: "JaCoCo".to_string(),
            class_column: "Class".to_string(),
            subtitle_success: "All classes meet coverage requirement. Well done! :white_check_mark:"
                .to_string(),
            subtitle_failure: "There are classes that do not meet coverage requirement :warning:"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub failure_file: PathBuf,
    /// Write the rendered markdown here instead of stdout
    pub markdown: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            failure_file: PathBuf::from(DEFAULT_FAILURE_FILE),
            markdown: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub enabled: bool,
    pub token: Option<String>,
    pub pull_request: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Like `load`, but a missing file means all defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("{} not found, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        let mut percentages = vec![
            ("thresholds.project", t.project),
            ("thresholds.class", t.class),
            ("thresholds.composable_class", t.composable_class),
        ];
        percentages.extend(t.packages.values().map(|v| ("thresholds.packages", *v)));
        percentages.extend(t.classes.iter().map(|c| ("thresholds.classes", c.minimum)));

        for (key, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("{} must be between 0 and 100, got {}", key, value);
            }
        }

        // compiles every pattern once so a bad regex fails at load time
        self.thresholds()?;

        regex::Regex::new(&self.report.delimiter)
            .with_context(|| format!("Invalid report.delimiter '{}'", self.report.delimiter))?;

        Ok(())
    }

    pub fn thresholds(&self) -> Result<ThresholdConfig, CoverageError> {
        let t = &self.thresholds;
        let classes = t
            .classes
            .iter()
            .map(|entry| entry.matcher().map(|m| (m, Percent(entry.minimum))))
            .collect::<Result<Vec<_>, CoverageError>>()?;

        Ok(ThresholdConfig {
            classes,
            composable_class: Percent(t.composable_class),
            packages: t
                .packages
                .iter()
                .map(|(prefix, v)| (prefix.clone(), Percent(*v)))
                .collect(),
            class_default: Percent(t.class),
            project: Percent(t.project),
        })
    }
}
