//! Source file to class identifier resolution
//!
//! `src/main/java/com/example/Foo.java` becomes `com/example/Foo`. Kotlin
//! files may declare several top-level types; each one gets its own
//! identifier pointing at the same file.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CoverageError, Result};

pub const DEFAULT_EXTENSIONS: &[&str] = &[".kt", ".java"];
pub const DEFAULT_DELIMITER: &str = "/java/|/kotlin/";
const KOTLIN_EXTENSION: &str = ".kt";

/// Class identifier to source file, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFileMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ClassFileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-inserting a class keeps its position and replaces the file.
    pub fn insert(&mut self, class_name: String, file_path: String) {
        match self.index.get(&class_name) {
            Some(&i) => self.entries[i].1 = file_path,
            None => {
                self.index.insert(class_name.clone(), self.entries.len());
                self.entries.push((class_name, file_path));
            }
        }
    }

    pub fn get(&self, class_name: &str) -> Option<&str> {
        self.index
            .get(class_name)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, f)| (c.as_str(), f.as_str()))
    }

    pub fn class_names(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps candidate source files to class identifiers
#[derive(Debug, Clone)]
pub struct ClassResolver {
    extensions: Vec<String>,
    delimiter: Regex,
    root: PathBuf,
}

impl ClassResolver {
    /// `root` is the directory candidate paths are relative to
    pub fn new(extensions: &[String], delimiter: &str, root: &Path) -> Result<Self> {
        let delimiter = Regex::new(delimiter).map_err(|source| CoverageError::InvalidPattern {
            pattern: delimiter.to_string(),
            source,
        })?;

        Ok(Self {
            extensions: extensions.to_vec(),
            delimiter,
            root: root.to_path_buf(),
        })
    }

    pub fn with_defaults(root: &Path) -> Self {
        let extensions: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        Self {
            extensions,
            delimiter: Regex::new(DEFAULT_DELIMITER).expect("default delimiter is a valid regex"),
            root: root.to_path_buf(),
        }
    }

    pub fn resolve(&self, files: &[String]) -> ClassFileMap {
        let mut map = ClassFileMap::new();

        for file in files.iter().filter(|f| self.is_allowed(f)) {
            let Some(primary) = self.primary_class(file) else {
                tracing::debug!("no class identifier for {}", file);
                continue;
            };
            map.insert(primary.clone(), file.clone());

            if file.ends_with(KOTLIN_EXTENSION) {
                for declared in scan_declarations(&self.root.join(file)).unwrap_or_default() {
                    if let Some(secondary) = secondary_class(&primary, &declared) {
                        map.insert(secondary, file.clone());
                    }
                }
            }
        }

        map
    }

    fn is_allowed(&self, file: &str) -> bool {
        self.extensions.iter().any(|ext| file.ends_with(ext.as_str()))
    }

    /// Segment after the first delimiter match, extension removed
    fn primary_class(&self, file: &str) -> Option<String> {
        let segment = self.delimiter.split(file).nth(1)?;
        let class_name = strip_extension(segment);
        if class_name.is_empty() {
            None
        } else {
            Some(class_name.to_string())
        }
    }
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].find('.') {
        Some(dot) => &path[..file_start + dot],
        None => path,
    }
}

/// Same package as `primary`, leaf replaced by `declared`; `None` for the primary itself.
fn secondary_class(primary: &str, declared: &str) -> Option<String> {
    match primary.rsplit_once('/') {
        Some((_, leaf)) if leaf == declared => None,
        Some((package, _)) => Some(format!("{}/{}", package, declared)),
        None if primary == declared => None,
        None => Some(declared.to_string()),
    }
}

fn declaration_regex() -> &'static Regex {
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    DECLARATION.get_or_init(|| {
        Regex::new(
            r"\b(?:(?:data|sealed|abstract|open|internal|private|protected|public|inline)\s+)*(?:class|interface|object)\s+([A-Za-z0-9_]+)(?:<.*?>)?",
        )
        .expect("declaration regex is valid")
    })
}

/// Names of class, interface and object declarations in a Kotlin file.
///
/// `None` when the file cannot be read.
pub fn scan_declarations(path: &Path) -> Option<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Some(declared_names(&content)),
        Err(e) => {
            tracing::debug!("declaration scan skipped for {}: {}", path.display(), e);
            None
        }
    }
}

pub fn declared_names(source: &str) -> Vec<String> {
    declaration_regex()
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MULTI_CLASS: &str = r#"package com.example

class MultiClass {
  // some code
}

data class DataClass(val property: String) {
  // some code
}

sealed class SealedClass {
  // some code
}

private class PrivateClass {
  // some code
}

abstract class AbstractClass {
  // some code
}

class GenericClass<T> {
  // some code
}

interface SomeInterface {
  // some code
}

object SingletonObject {
  // some code
}
"#;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_primary_class_from_path() {
        let dir = TempDir::new().unwrap();
        let resolver = ClassResolver::with_defaults(dir.path());
        let map = resolver.resolve(&files(&[
            "src/java/com/example/CachedRepository.java",
            "app/src/main/kotlin/io/sample/UseCase.kt",
            "README.md",
            "scripts/Tool.java",
        ]));

        let entries: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(
            entries,
            vec![
                (
                    "com/example/CachedRepository",
                    "src/java/com/example/CachedRepository.java"
                ),
                ("io/sample/UseCase", "app/src/main/kotlin/io/sample/UseCase.kt"),
            ]
        );
    }

    #[test]
    fn test_custom_extensions_and_delimiter() {
        let dir = TempDir::new().unwrap();
        let resolver =
            ClassResolver::new(&[".scala".to_string()], "/scala/", dir.path()).unwrap();
        let map = resolver.resolve(&files(&[
            "core/src/main/scala/org/demo/Service.scala",
            "core/src/main/java/org/demo/Legacy.java",
        ]));

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("org/demo/Service"),
            Some("core/src/main/scala/org/demo/Service.scala")
        );
    }

    #[test]
    fn test_invalid_delimiter() {
        let dir = TempDir::new().unwrap();
        assert!(ClassResolver::new(&[], "(", dir.path()).is_err());
    }

    #[test]
    fn test_kotlin_multiple_declarations() {
        let dir = TempDir::new().unwrap();
        let kotlin_file = "src/kotlin/com/example/MultiClass.kt";
        let full = dir.path().join(kotlin_file);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, MULTI_CLASS).unwrap();

        let resolver = ClassResolver::with_defaults(dir.path());
        let map = resolver.resolve(&files(&[kotlin_file]));

        let names: Vec<&str> = map.iter().map(|(c, _)| c).collect();
        assert_eq!(
            names,
            vec![
                "com/example/MultiClass",
                "com/example/DataClass",
                "com/example/SealedClass",
                "com/example/PrivateClass",
                "com/example/AbstractClass",
                "com/example/GenericClass",
                "com/example/SomeInterface",
                "com/example/SingletonObject",
            ]
        );
        assert!(map.iter().all(|(_, f)| f == kotlin_file));
    }

    #[test]
    fn test_unreadable_kotlin_file_yields_primary_only() {
        let dir = TempDir::new().unwrap();
        let resolver = ClassResolver::with_defaults(dir.path());
        let map = resolver.resolve(&files(&["src/kotlin/com/example/Gone.kt"]));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("com/example/Gone"), Some("src/kotlin/com/example/Gone.kt"));
        assert_eq!(scan_declarations(&dir.path().join("Gone.kt")), None);
    }

    #[test]
    fn test_duplicate_declarations_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let kotlin_file = "src/kotlin/a/Main.kt";
        let full = dir.path().join(kotlin_file);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, "class Main\nobject Helper\nclass Helper\n").unwrap();

        let resolver = ClassResolver::with_defaults(dir.path());
        let map = resolver.resolve(&files(&[kotlin_file]));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a/Helper"), Some(kotlin_file));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let kotlin_file = "src/kotlin/com/example/MultiClass.kt";
        let full = dir.path().join(kotlin_file);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, MULTI_CLASS).unwrap();

        let resolver = ClassResolver::with_defaults(dir.path());
        let input = files(&[kotlin_file, "src/java/com/example/CachedRepository.java"]);
        assert_eq!(resolver.resolve(&input), resolver.resolve(&input));
    }

    #[test]
    fn test_declared_names_with_modifiers() {
        let names = declared_names(
            "internal open class Base<T : Any>\npublic inline class Wrapper(val v: Int)\nfun notAClass() {}",
        );
        assert_eq!(names, vec!["Base", "Wrapper"]);
    }

    #[test]
    fn test_secondary_class_in_default_package() {
        assert_eq!(secondary_class("Main", "Helper"), Some("Helper".to_string()));
        assert_eq!(secondary_class("Main", "Main"), None);
        assert_eq!(secondary_class("a/b/Main", "Main"), None);
        assert_eq!(secondary_class("a/b/Main", "Other"), Some("a/b/Other".to_string()));
    }

    #[test]
    fn test_class_file_map_reinsert_keeps_position() {
        let mut map = ClassFileMap::new();
        map.insert("a/One".to_string(), "one.kt".to_string());
        map.insert("a/Two".to_string(), "two.kt".to_string());
        map.insert("a/One".to_string(), "other.kt".to_string());

        let entries: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(entries, vec![("a/One", "other.kt"), ("a/Two", "two.kt")]);
    }
}
