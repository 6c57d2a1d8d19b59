//! Schema metadata
//!
//! Loads the flat column listing exported from a database catalog
//! (`[{"object_name": ..., "column_name": ...}, ...]`) into a lookup of
//! objects and their columns. Names are upper-cased on load so that lookups
//! are case-insensitive.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::matcher::IdentifierMatcher;
use crate::types::SharedColumns;

/// Errors raised while loading schema metadata
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row of the catalog export. Extra fields (data type, owner, ...) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnRecord {
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub column_name: Option<String>,
}

/// Known schema objects and their columns
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    /// Object name to columns in load order
    objects: BTreeMap<String, Vec<String>>,
    column_sets: HashMap<String, HashSet<String>>,
    all_columns: HashSet<String>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from catalog rows, skipping rows without both names
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ColumnRecord>,
    {
        let mut catalog = Self::new();
        let mut skipped = 0usize;

        for record in records {
            let object = record.object_name.unwrap_or_default();
            let column = record.column_name.unwrap_or_default();
            if !catalog.insert(&object, &column) {
                skipped += 1;
            }
        }

        if skipped > 0 {
            debug!("Skipped {} metadata rows without object or column name", skipped);
        }
        catalog
    }

    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        let records: Vec<ColumnRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Load a catalog export from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&json)?;
        info!(
            "Loaded column data for {} objects ({} columns) from {}",
            catalog.object_count(),
            catalog.column_count(),
            path.display()
        );
        Ok(catalog)
    }

    /// Register a column of an object. Returns false when either name is blank.
    pub fn insert(&mut self, object: &str, column: &str) -> bool {
        let object = object.trim().to_uppercase();
        let column = column.trim().to_uppercase();
        if object.is_empty() || column.is_empty() {
            return false;
        }

        let set = self.column_sets.entry(object.clone()).or_default();
        if set.insert(column.clone()) {
            self.objects.entry(object).or_default().push(column.clone());
            self.all_columns.insert(column);
        }
        true
    }

    /// Register an object with no known columns
    pub fn insert_object(&mut self, object: &str) -> bool {
        let object = object.trim().to_uppercase();
        if object.is_empty() {
            return false;
        }
        self.column_sets.entry(object.clone()).or_default();
        self.objects.entry(object).or_default();
        true
    }

    /// Object names in sorted order
    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Total number of (object, column) pairs
    pub fn column_count(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Columns of an object in load order; empty for unknown objects
    pub fn columns(&self, object: &str) -> &[String] {
        self.objects.get(object).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn is_column_of(&self, object: &str, column: &str) -> bool {
        self.column_sets
            .get(object)
            .is_some_and(|columns| columns.contains(column))
    }

    /// A name known only as a column, never as an object
    pub fn is_column_only(&self, name: &str) -> bool {
        !self.objects.contains_key(name) && self.all_columns.contains(name)
    }

    /// Column names both objects have, with a match score relative to their sizes
    pub fn shared_columns(&self, object: &str, other: &str) -> SharedColumns {
        let (Some(left), Some(right)) = (self.column_sets.get(object), self.column_sets.get(other)) else {
            return SharedColumns::default();
        };
        if left.is_empty() || right.is_empty() {
            return SharedColumns::default();
        }

        let mut columns: Vec<String> = left.intersection(right).cloned().collect();
        columns.sort();
        let match_score = (columns.len() * 2) as f64 / (left.len() + right.len()) as f64;

        SharedColumns {
            columns,
            match_score,
        }
    }

    /// Matcher over every object name
    pub fn identifier_matcher(&self) -> IdentifierMatcher {
        self.objects().collect()
    }

    /// Matcher over an object's columns plus the object name itself
    pub fn column_matcher(&self, object: &str) -> IdentifierMatcher {
        let mut matcher: IdentifierMatcher = self.columns(object).iter().collect();
        matcher.add(object);
        matcher
    }
}
