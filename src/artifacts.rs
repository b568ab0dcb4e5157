//! Failure status artifact
//!
//! Written when a coverage gate fails so later pipeline steps can pick up the
//! evaluated classes and where their reports live.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureArtifact {
    pub failures: Vec<FailureEntry>,
}

impl FailureArtifact {
    pub fn new<'a>(class_names: impl IntoIterator<Item = &'a str>, report_url: &str) -> Self {
        Self {
            failures: class_names
                .into_iter()
                .map(|name| FailureEntry {
                    name: name.to_string(),
                    path: report_location(name, report_url),
                })
                .collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        tracing::debug!("failure artifact written to {}", path.display());
        Ok(())
    }
}

pub fn load_artifact(path: &Path) -> Result<FailureArtifact> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Relative HTML report path: `com/example/Foo` -> `com.example/Foo.html`
pub fn report_filepath(class_name: &str) -> String {
    match class_name.rsplit_once('/') {
        Some((package, leaf)) => format!("{}/{}.html", package.replace('/', "."), leaf),
        None => format!("{}.html", class_name),
    }
}

/// Bare class name without a report URL, the full report link otherwise
pub fn report_location(class_name: &str, report_url: &str) -> String {
    if report_url.is_empty() {
        class_name.to_string()
    } else {
        format!("{}{}", report_url, report_filepath(class_name))
    }
}

/// Markdown cell for a class, linked when a report URL is configured
pub fn report_link(class_name: &str, report_url: &str) -> String {
    if report_url.is_empty() {
        format!("`{}`", class_name)
    } else {
        format!("[`{}`]({})", class_name, report_location(class_name, report_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_filepath() {
        assert_eq!(
            report_filepath("com/example/CachedRepository"),
            "com.example/CachedRepository.html"
        );
        assert_eq!(report_filepath("a/B"), "a/B.html");
        assert_eq!(report_filepath("Main"), "Main.html");
    }

    #[test]
    fn test_report_link() {
        assert_eq!(
            report_link("com/example/CachedRepository", ""),
            "`com/example/CachedRepository`"
        );
        assert_eq!(
            report_link("com/example/CachedRepository", "http://test.com/"),
            "[`com/example/CachedRepository`](http://test.com/com.example/CachedRepository.html)"
        );
    }

    #[test]
    fn test_save_and_load_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/status.json");

        let artifact = FailureArtifact::new(
            ["com/example/CachedRepository", "io/sample/UseCase"],
            "",
        );
        artifact.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw,
            r#"{"failures":[{"name":"com/example/CachedRepository","path":"com/example/CachedRepository"},{"name":"io/sample/UseCase","path":"io/sample/UseCase"}]}"#
        );
        assert_eq!(load_artifact(&path).unwrap(), artifact);
    }

    #[test]
    fn test_artifact_paths_with_report_url() {
        let artifact = FailureArtifact::new(["com/example/CachedRepository"], "http://test.com/");
        assert_eq!(
            artifact.failures[0].path,
            "http://test.com/com.example/CachedRepository.html"
        );
    }
}
