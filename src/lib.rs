//! schemamap: Database schema identifiers in source code
//!
//! Finds mentions of database objects (tables, views) and their columns in
//! a source tree and infers which objects are related from how close
//! together their mentions appear.
//!
//! ## Pipeline
//!
//! - `metadata`: load the schema catalog (objects and their columns)
//! - `matcher`: trie index that finds whole-word identifier mentions in text
//! - `scan`: turn matches in a file into references with surrounding context
//! - `proximity`: score object and column relationships by mention distance
//! - `report`: render the analysis as Markdown (or JSON via serde)

pub mod cli;
pub mod matcher;
pub mod metadata;
pub mod proximity;
pub mod report;
pub mod scan;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use matcher::IdentifierMatcher;
use scan::{Scanner, DEFAULT_CONTEXT_LINES};
use types::Reference;

/// Configuration for scanning a source tree
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: String,
    /// File extensions to include, compared case-insensitively (empty = all)
    pub extensions: Vec<String>,
    /// Directory names to skip anywhere in the tree
    pub exclude_dirs: Vec<String>,
    /// Whether to follow gitignore rules
    pub respect_gitignore: bool,
    /// Lines of context kept on each side of a mention
    pub context_lines: usize,
    pub case_sensitive: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            extensions: [
                "sql", "py", "java", "js", "ts", "php", "pl", "sh", "bat", "cmd", "ps1", "c",
                "cpp", "h", "cs", "vb", "rb", "go", "rs", "kt", "scala", "al",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
            exclude_dirs: [
                ".git",
                ".svn",
                ".hg",
                "__pycache__",
                "node_modules",
                ".pytest_cache",
                ".mypy_cache",
                "venv",
                "env",
                "target",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            respect_gitignore: true,
            context_lines: DEFAULT_CONTEXT_LINES,
            case_sensitive: false,
        }
    }
}

impl ScanConfig {
    fn wants_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}

/// Statistics from scanning
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Files read and scanned
    pub files: u64,
    /// Files with at least one mention
    pub files_with_matches: u64,
    pub lines: u64,
    pub references: u64,
    /// Unreadable or non-UTF-8 files
    pub errors: u64,
}

/// References found in a source tree
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub references: Vec<Reference>,
    pub stats: ScanStats,
}

/// Walk the configured root and collect every identifier mention
pub fn scan_corpus(matcher: &IdentifierMatcher, config: &ScanConfig) -> Result<ScanOutput> {
    let root = Path::new(&config.root)
        .canonicalize()
        .with_context(|| format!("Invalid scan root: {}", config.root))?;
    info!("Scanning {} for {} identifiers", root.display(), matcher.len());

    let paths = collect_files(&root, config);
    debug!("{} candidate files", paths.len());

    let scanner = Scanner::new(matcher)
        .with_context_lines(config.context_lines)
        .with_case_sensitive(config.case_sensitive);

    let mut results: Vec<(String, Option<scan::ScanResult>)> = paths
        .par_iter()
        .map(|path| {
            let rel_path = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .display()
                .to_string();
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let result = scanner.scan_file(&rel_path, &content);
                    (rel_path, Some(result))
                }
                Err(err) => {
                    debug!("Failed to read {}: {}", rel_path, err);
                    (rel_path, None)
                }
            }
        })
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut output = ScanOutput::default();
    for (_, result) in results {
        let Some(result) = result else {
            output.stats.errors += 1;
            continue;
        };
        output.stats.files += 1;
        output.stats.lines += result.lines;
        if !result.references.is_empty() {
            output.stats.files_with_matches += 1;
        }
        output.stats.references += result.references.len() as u64;
        output.references.extend(result.references);
    }

    info!(
        "Scanned {} files, {} references in {} files",
        output.stats.files, output.stats.references, output.stats.files_with_matches
    );
    if output.stats.errors > 0 {
        warn!("{} files could not be read", output.stats.errors);
    }

    Ok(output)
}

fn collect_files(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(false)
        .git_ignore(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .sort_by_file_name(|a, b| a.cmp(b));

    let exclude = config.clone();
    walker.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        !(is_dir && entry.depth() > 0 && exclude.is_excluded_dir(&entry.file_name().to_string_lossy()))
    });

    let mut paths = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("Error walking directory: {}", err);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !config.wants_extension(path) {
            continue;
        }
        paths.push(path.to_path_buf());
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        let config = ScanConfig::default();
        assert!(config.wants_extension(Path::new("a/b/proc.SQL")));
        assert!(config.wants_extension(Path::new("load.py")));
        assert!(!config.wants_extension(Path::new("README.md")));
        assert!(!config.wants_extension(Path::new("Makefile")));

        let all = ScanConfig {
            extensions: Vec::new(),
            ..Default::default()
        };
        assert!(all.wants_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_excluded_dirs() {
        let config = ScanConfig::default();
        assert!(config.is_excluded_dir("node_modules"));
        assert!(config.is_excluded_dir(".git"));
        assert!(!config.is_excluded_dir("src"));
    }
}
