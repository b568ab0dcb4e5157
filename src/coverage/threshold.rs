//! Coverage threshold resolution
//!
//! Each class gets exactly one required percentage, first match wins:
//! 1. class map entry (literal name or regex, in declared order)
//! 2. composable override, when the source file contains `@Composable`
//! 3. deepest matching package prefix
//! 4. class default

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::Percent;
use crate::error::{CoverageError, Result};

/// Annotation that marks a UI-declarative source file
pub const COMPOSABLE_MARKER: &str = "@Composable";

/// Outcome of comparing achieved coverage with the requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Skull,
    Warning,
    Check,
}

/// Emoji shown when a class has no usable coverage data
pub const UNKNOWN_TIER_EMOJI: &str = ":black_joker:";

impl Tier {
    /// `required / 2` is compared unrounded
    pub fn of(covered: f64, required: f64) -> Self {
        if covered < required / 2.0 {
            Tier::Skull
        } else if covered < required {
            Tier::Warning
        } else {
            Tier::Check
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Tier::Skull => ":skull:",
            Tier::Warning => ":warning:",
            Tier::Check => ":white_check_mark:",
        }
    }
}

/// Key of a class threshold entry
#[derive(Debug, Clone)]
pub enum ClassMatcher {
    /// Exact class name
    Literal(String),
    /// Regex searched anywhere in the class name
    Pattern(Regex),
}

impl ClassMatcher {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(ClassMatcher::Pattern)
            .map_err(|source| CoverageError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn matches(&self, class_name: &str) -> bool {
        match self {
            ClassMatcher::Literal(name) => name == class_name,
            ClassMatcher::Pattern(regex) => regex.is_match(class_name),
        }
    }
}

impl fmt::Display for ClassMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassMatcher::Literal(name) => f.write_str(name),
            ClassMatcher::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Immutable threshold settings for one evaluation
#[derive(Debug, Clone, Default)]
pub struct ThresholdConfig {
    /// Checked in declaration order
    pub classes: Vec<(ClassMatcher, Percent)>,
    pub composable_class: Percent,
    /// Keys are slash-terminated package paths, e.g. `com/example/`
    pub packages: HashMap<String, Percent>,
    pub class_default: Percent,
    pub project: Percent,
}

/// Which layer produced a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdSource {
    Class(String),
    Composable,
    Package(String),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequiredCoverage {
    pub percent: Percent,
    pub source: ThresholdSource,
}

/// Resolves the required coverage of a class
pub struct ThresholdResolver<'a> {
    config: &'a ThresholdConfig,
    root: PathBuf,
}

impl<'a> ThresholdResolver<'a> {
    /// `root` is the directory source file paths are relative to
    pub fn new(config: &'a ThresholdConfig, root: &Path) -> Self {
        Self {
            config,
            root: root.to_path_buf(),
        }
    }

    pub fn required(&self, class_name: &str, file_path: &str) -> RequiredCoverage {
        let resolved = self.resolve(class_name, file_path);
        tracing::debug!(
            class = class_name,
            required = %resolved.percent,
            source = ?resolved.source,
            "resolved class threshold"
        );
        resolved
    }

    fn resolve(&self, class_name: &str, file_path: &str) -> RequiredCoverage {
        if let Some((matcher, percent)) = self
            .config
            .classes
            .iter()
            .find(|(matcher, _)| matcher.matches(class_name))
        {
            return RequiredCoverage {
                percent: *percent,
                source: ThresholdSource::Class(matcher.to_string()),
            };
        }

        if contains_composable_marker(&self.root.join(file_path)) == Some(true) {
            return RequiredCoverage {
                percent: self.config.composable_class,
                source: ThresholdSource::Composable,
            };
        }

        if let Some((prefix, percent)) = package_threshold(&self.config.packages, class_name) {
            return RequiredCoverage {
                percent,
                source: ThresholdSource::Package(prefix),
            };
        }

        RequiredCoverage {
            percent: self.config.class_default,
            source: ThresholdSource::Default,
        }
    }
}

/// `None` when the file cannot be read, otherwise whether the marker occurs.
pub fn contains_composable_marker(path: &Path) -> Option<bool> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content.contains(COMPOSABLE_MARKER)),
        Err(e) => {
            tracing::debug!("composable scan skipped for {}: {}", path.display(), e);
            None
        }
    }
}

/// Deepest configured package prefix of `class_name`.
///
/// `com/example/Foo` looks up `com/example/`, then `com/`, then the empty prefix.
pub fn package_threshold(
    packages: &HashMap<String, Percent>,
    class_name: &str,
) -> Option<(String, Percent)> {
    if packages.is_empty() {
        return None;
    }

    let segments: Vec<&str> = class_name.split('/').collect();
    (0..segments.len()).rev().find_map(|depth| {
        let prefix = if depth == 0 {
            String::new()
        } else {
            format!("{}/", segments[..depth].join("/"))
        };
        packages.get(&prefix).map(|percent| (prefix, *percent))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn packages(entries: &[(&str, f64)]) -> HashMap<String, Percent> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Percent(*v)))
            .collect()
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::of(50.0, 100.0), Tier::Warning);
        assert_eq!(Tier::of(10.0, 100.0), Tier::Skull);
        assert_eq!(Tier::of(100.0, 50.0), Tier::Check);
        assert_eq!(Tier::of(50.0, 50.0), Tier::Check);
        // half of an odd requirement is not rounded
        assert_eq!(Tier::of(27.0, 55.0), Tier::Skull);
        assert_eq!(Tier::of(0.0, 0.0), Tier::Check);
    }

    #[test]
    fn test_longest_package_prefix_wins() {
        let map = packages(&[("com/", 90.0), ("com/example/", 70.0)]);
        assert_eq!(
            package_threshold(&map, "com/example/CachedRepository"),
            Some(("com/example/".to_string(), Percent(70.0)))
        );

        let map = packages(&[("com/example/", 77.0), ("com/", 30.0)]);
        assert_eq!(
            package_threshold(&map, "com/example/CachedRepository").map(|(_, p)| p),
            Some(Percent(77.0))
        );
        assert_eq!(
            package_threshold(&map, "com/other/Thing").map(|(_, p)| p),
            Some(Percent(30.0))
        );
        assert_eq!(package_threshold(&map, "io/sample/UseCase"), None);
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let map = packages(&[("", 15.0)]);
        assert_eq!(
            package_threshold(&map, "io/sample/UseCase").map(|(_, p)| p),
            Some(Percent(15.0))
        );
    }

    #[test]
    fn test_prefix_must_end_on_segment_boundary() {
        let map = packages(&[("com/exam", 10.0)]);
        assert_eq!(package_threshold(&map, "com/example/Foo"), None);
    }

    #[test]
    fn test_class_map_beats_package_and_default() {
        let dir = TempDir::new().unwrap();
        let config = ThresholdConfig {
            classes: vec![(
                ClassMatcher::Literal("com/example/CachedRepository".to_string()),
                Percent(10.0),
            )],
            packages: packages(&[("com/example/", 90.0), ("com/", 85.0)]),
            class_default: Percent(95.0),
            ..Default::default()
        };
        let resolver = ThresholdResolver::new(&config, dir.path());

        let required = resolver.required("com/example/CachedRepository", "missing.java");
        assert_eq!(required.percent, Percent(10.0));
        assert_eq!(
            required.source,
            ThresholdSource::Class("com/example/CachedRepository".to_string())
        );

        let other = resolver.required("com/example/Other", "missing.java");
        assert_eq!(other.percent, Percent(90.0));
    }

    #[test]
    fn test_first_declared_pattern_wins() {
        let dir = TempDir::new().unwrap();
        let config = ThresholdConfig {
            classes: vec![
                (ClassMatcher::pattern(".*Repository").unwrap(), Percent(60.0)),
                (
                    ClassMatcher::Literal("com/example/CachedRepository".to_string()),
                    Percent(100.0),
                ),
            ],
            ..Default::default()
        };
        let resolver = ThresholdResolver::new(&config, dir.path());

        let required = resolver.required("com/example/CachedRepository", "x.java");
        assert_eq!(required.percent, Percent(60.0));
        assert_eq!(
            required.source,
            ThresholdSource::Class("/.*Repository/".to_string())
        );
    }

    #[test]
    fn test_composable_marker_override() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Widget.kt"),
            "class Vika { @Composable fun someUiWidget() {} }",
        )
        .unwrap();
        std::fs::write(dir.path().join("Plain.kt"), "class Vika { fun main() {} }").unwrap();

        let config = ThresholdConfig {
            composable_class: Percent(45.0),
            class_default: Percent(55.0),
            ..Default::default()
        };
        let resolver = ThresholdResolver::new(&config, dir.path());

        let widget = resolver.required("com/example/Widget", "Widget.kt");
        assert_eq!(widget.percent, Percent(45.0));
        assert_eq!(widget.source, ThresholdSource::Composable);

        let plain = resolver.required("com/example/Plain", "Plain.kt");
        assert_eq!(plain.percent, Percent(55.0));
        assert_eq!(plain.source, ThresholdSource::Default);
    }

    #[test]
    fn test_class_map_beats_composable_marker() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Widget.kt"), "@Composable fun A() {}").unwrap();

        let config = ThresholdConfig {
            classes: vec![(ClassMatcher::pattern("Widget$").unwrap(), Percent(80.0))],
            composable_class: Percent(10.0),
            ..Default::default()
        };
        let resolver = ThresholdResolver::new(&config, dir.path());
        assert_eq!(
            resolver.required("com/example/Widget", "Widget.kt").percent,
            Percent(80.0)
        );
    }

    #[test]
    fn test_marker_scan_distinguishes_unreadable() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("Plain.kt");
        std::fs::write(&plain, "class Plain").unwrap();

        assert_eq!(contains_composable_marker(&plain), Some(false));
        assert_eq!(contains_composable_marker(&dir.path().join("Gone.kt")), None);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            ClassMatcher::pattern("(unclosed"),
            Err(CoverageError::InvalidPattern { .. })
        ));
    }
}
