//! Core type definitions for schemamap
//!
//! Defines the data shared between the matcher, the scanner and the
//! relationship engine:
//! - Matches: identifier occurrences inside a piece of text
//! - References: located mentions of a schema object in a source file
//! - Relationship candidates: scored object/object and object/column pairs
//! - Analysis results: per-object reports, global rankings and counters

use serde::{Deserialize, Serialize};

/// The part of a reference's text a mention was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextZone {
    /// The matched line itself
    #[serde(rename = "line_text")]
    Line,
    /// Text preceding the anchor mention
    #[serde(rename = "context_before")]
    Before,
    /// Text following the anchor mention
    #[serde(rename = "context_after")]
    After,
}

impl ContextZone {
    pub const ALL: [ContextZone; 3] = [ContextZone::Before, ContextZone::Line, ContextZone::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextZone::Line => "line_text",
            ContextZone::Before => "context_before",
            ContextZone::After => "context_after",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "line_text" | "line" => Some(ContextZone::Line),
            "context_before" | "before" => Some(ContextZone::Before),
            "context_after" | "after" => Some(ContextZone::After),
            _ => None,
        }
    }
}

/// An identifier occurrence in a piece of text.
///
/// Offsets are byte offsets into the scanned `&str`, so
/// `&text[m.start..m.end]` is the matched slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// The identifier exactly as it was added to the index
    pub identifier: String,
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

impl Match {
    pub fn new(identifier: &str, start: usize, end: usize) -> Self {
        Self {
            identifier: identifier.to_string(),
            start,
            end,
            length: end - start,
        }
    }
}

/// A located mention of a schema object in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub object_name: String,
    pub file_path: String,
    /// 1-based line number; records without one are skipped during analysis
    pub line_number: Option<u32>,
    /// 0-based character column of the mention within its line
    #[serde(default)]
    pub column: u32,
    /// Absolute character offset of the mention within its file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_offset: Option<u64>,
    #[serde(default)]
    pub context_before: Vec<String>,
    #[serde(default)]
    pub line_text: String,
    #[serde(default)]
    pub context_after: Vec<String>,
}

impl Reference {
    pub fn new(object_name: impl Into<String>, file_path: impl Into<String>, line_number: u32) -> Self {
        Self {
            object_name: object_name.into(),
            file_path: file_path.into(),
            line_number: Some(line_number),
            column: 0,
            char_offset: None,
            context_before: Vec::new(),
            line_text: String::new(),
            context_after: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    pub fn with_offset(mut self, char_offset: u64) -> Self {
        self.char_offset = Some(char_offset);
        self
    }

    pub fn with_context(
        mut self,
        context_before: Vec<String>,
        line_text: impl Into<String>,
        context_after: Vec<String>,
    ) -> Self {
        self.context_before = context_before;
        self.line_text = line_text.into();
        self.context_after = context_after;
        self
    }

    /// Check the fields the relationship engine relies on, returning the line number
    pub fn validate(&self) -> Result<u32, &'static str> {
        if self.object_name.trim().is_empty() {
            return Err("missing object name");
        }
        if self.file_path.is_empty() {
            return Err("missing file path");
        }
        match self.line_number {
            None => Err("missing line number"),
            Some(0) => Err("line numbers are 1-based"),
            Some(line) => Ok(line),
        }
    }

    /// Whether the reference carries any text to look for column mentions in
    pub fn has_context(&self) -> bool {
        !self.line_text.is_empty() || !self.context_before.is_empty() || !self.context_after.is_empty()
    }
}

/// What a relationship candidate points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum RelationTarget {
    /// Another schema object co-occurring with the subject
    Object(String),
    /// A column of the subject mentioned near it
    Column(String),
}

impl RelationTarget {
    pub fn name(&self) -> &str {
        match self {
            RelationTarget::Object(name) | RelationTarget::Column(name) => name,
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self, RelationTarget::Column(_))
    }
}

/// Weighted score accumulated per context zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneScores {
    pub line_text: f64,
    pub context_before: f64,
    pub context_after: f64,
}

impl ZoneScores {
    pub fn get(&self, zone: ContextZone) -> f64 {
        match zone {
            ContextZone::Line => self.line_text,
            ContextZone::Before => self.context_before,
            ContextZone::After => self.context_after,
        }
    }

    pub fn add(&mut self, zone: ContextZone, value: f64) {
        match zone {
            ContextZone::Line => self.line_text += value,
            ContextZone::Before => self.context_before += value,
            ContextZone::After => self.context_after += value,
        }
    }

    pub fn merge(&mut self, other: &ZoneScores) {
        self.line_text += other.line_text;
        self.context_before += other.context_before;
        self.context_after += other.context_after;
    }
}

/// A scored relationship between a subject object and another object or one of its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipCandidate {
    pub subject: String,
    pub target: RelationTarget,
    /// Number of qualifying occurrences
    pub cooccurrences: u64,
    /// Sum of `proximity * weight` over every occurrence
    pub score: f64,
    pub best_proximity: f64,
    /// Smallest character distance seen between the two mentions
    pub min_distance: u64,
    pub zone_scores: ZoneScores,
    /// Number of files the relationship was seen in
    pub files: u64,
    /// Columns the two objects have in common; object relationships only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_columns: Option<SharedColumns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<RelationshipStrength>,
}

impl RelationshipCandidate {
    pub fn new(subject: impl Into<String>, target: RelationTarget) -> Self {
        Self {
            subject: subject.into(),
            target,
            cooccurrences: 0,
            score: 0.0,
            best_proximity: 0.0,
            min_distance: u64::MAX,
            zone_scores: ZoneScores::default(),
            files: 1,
            shared_columns: None,
            strength: None,
        }
    }

    /// Record one occurrence at `distance` characters
    pub fn record(&mut self, distance: u64, proximity: f64, zone: ContextZone, weight: f64) {
        let contribution = proximity * weight;
        self.cooccurrences += 1;
        self.score += contribution;
        self.zone_scores.add(zone, contribution);
        self.best_proximity = self.best_proximity.max(proximity);
        self.min_distance = self.min_distance.min(distance);
    }

    /// Fold a partial result for the same relationship from another file
    pub fn merge(&mut self, other: &RelationshipCandidate) {
        self.cooccurrences += other.cooccurrences;
        self.score += other.score;
        self.zone_scores.merge(&other.zone_scores);
        self.best_proximity = self.best_proximity.max(other.best_proximity);
        self.min_distance = self.min_distance.min(other.min_distance);
        self.files += other.files;
    }
}

/// Column names two objects have in common, a likely join key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedColumns {
    /// Shared names in sorted order
    pub columns: Vec<String>,
    /// `2 * shared / (subject columns + related columns)`, 0 when either side has none
    pub match_score: f64,
}

/// Coarse band of a relationship's overall strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrengthLevel {
    Minimal,
    Weak,
    Moderate,
    Strong,
}

impl StrengthLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            StrengthLevel::Strong
        } else if score >= 0.4 {
            StrengthLevel::Moderate
        } else if score >= 0.1 {
            StrengthLevel::Weak
        } else {
            StrengthLevel::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthLevel::Strong => "STRONG",
            StrengthLevel::Moderate => "MODERATE",
            StrengthLevel::Weak => "WEAK",
            StrengthLevel::Minimal => "MINIMAL",
        }
    }
}

/// Combined evidence that two objects are related
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipStrength {
    pub overall: f64,
    pub level: StrengthLevel,
    pub cooccurrence_score: f64,
    pub column_score: f64,
    pub exact_match_score: f64,
    pub cross_column_score: f64,
}

/// Columns of the subject mentioned in text that also mentions a related object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipColumns {
    pub subject: String,
    pub related: String,
    /// Subject references whose context text also mentions the related object
    pub documents: u64,
    /// Highest scoring columns, at most top-N
    pub columns: Vec<RelationshipCandidate>,
}

/// Whether any relationship was found for an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    Found,
    NotFound,
}

impl ObjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectStatus::Found => "found",
            ObjectStatus::NotFound => "not_found",
        }
    }
}

/// Relationships of one schema object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectReport {
    pub object: String,
    pub status: ObjectStatus,
    /// Aggregate score over all of the object's relationships, not only the top ones
    pub score: f64,
    pub related_objects: Vec<RelationshipCandidate>,
    pub top_columns: Vec<RelationshipCandidate>,
}

impl ObjectReport {
    pub fn not_found(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            status: ObjectStatus::NotFound,
            score: 0.0,
            related_objects: Vec::new(),
            top_columns: Vec::new(),
        }
    }
}

/// Counters describing an analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub objects_analyzed: u64,
    pub objects_with_relationships: u64,
    /// Object pair occurrences within the distance threshold
    pub total_cooccurrences: u64,
    /// Column mentions credited to an object
    pub column_mentions: u64,
    pub files_analyzed: u64,
    /// Files dropped from the pair scan because they mention a single identifier
    pub files_single_object: u64,
    /// Malformed references that were skipped
    pub skipped_references: u64,
    /// Reference pairs whose explicit offsets contradict their line order
    #[serde(default)]
    pub inconsistent_distances: u64,
}

impl AnalysisSummary {
    /// Fraction of analyzed objects with at least one relationship
    pub fn success_rate(&self) -> f64 {
        if self.objects_analyzed == 0 {
            0.0
        } else {
            self.objects_with_relationships as f64 / self.objects_analyzed as f64
        }
    }
}

/// Result of a relationship analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    pub objects: Vec<ObjectReport>,
    pub global_relationships: Vec<RelationshipCandidate>,
    pub global_columns: Vec<RelationshipCandidate>,
    /// Column breakdown per kept object relationship, ordered by subject then related object
    #[serde(default)]
    pub relationship_columns: Vec<RelationshipColumns>,
    /// `object.column` totals over every relationship's top columns
    #[serde(default)]
    pub global_relationship_columns: Vec<RelationshipCandidate>,
    pub summary: AnalysisSummary,
}

impl RelationshipAnalysis {
    pub fn object(&self, name: &str) -> Option<&ObjectReport> {
        self.objects.iter().find(|report| report.object == name)
    }

    /// Column breakdown of the `subject -> related` relationship
    pub fn relationship_columns(&self, subject: &str, related: &str) -> Option<&RelationshipColumns> {
        self.relationship_columns
            .iter()
            .find(|entry| entry.subject == subject && entry.related == related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_zone_as_str() {
        assert_eq!(ContextZone::Line.as_str(), "line_text");
        assert_eq!(ContextZone::Before.as_str(), "context_before");
        assert_eq!(ContextZone::After.as_str(), "context_after");
    }

    #[test]
    fn test_context_zone_from_str() {
        assert_eq!(ContextZone::from_str("line_text"), Some(ContextZone::Line));
        assert_eq!(ContextZone::from_str("before"), Some(ContextZone::Before));
        assert_eq!(ContextZone::from_str("context_after"), Some(ContextZone::After));
        assert_eq!(ContextZone::from_str("middle"), None);
        assert_eq!(ContextZone::from_str(""), None);
    }

    #[test]
    fn test_context_zone_serialization() {
        let json = serde_json::to_string(&ContextZone::Before).unwrap();
        assert_eq!(json, "\"context_before\"");

        let parsed: ContextZone = serde_json::from_str("\"line_text\"").unwrap();
        assert_eq!(parsed, ContextZone::Line);
    }

    #[test]
    fn test_match_length() {
        let m = Match::new("EMPLOYEES", 4, 13);
        assert_eq!(m.length, 9);
        assert_eq!(m.identifier, "EMPLOYEES");
    }

    #[test]
    fn test_reference_validate() {
        let valid = Reference::new("EMPLOYEES", "src/hr.sql", 10);
        assert_eq!(valid.validate(), Ok(10));

        let mut missing_line = valid.clone();
        missing_line.line_number = None;
        assert!(missing_line.validate().is_err());

        let mut zero_line = valid.clone();
        zero_line.line_number = Some(0);
        assert!(zero_line.validate().is_err());

        let no_name = Reference::new("  ", "src/hr.sql", 3);
        assert!(no_name.validate().is_err());

        let no_path = Reference::new("EMPLOYEES", "", 3);
        assert!(no_path.validate().is_err());
    }

    #[test]
    fn test_reference_deserializes_with_missing_fields() {
        let json = r#"{"object_name": "EMPLOYEES", "file_path": "a.sql", "line_number": null}"#;
        let reference: Reference = serde_json::from_str(json).unwrap();
        assert_eq!(reference.line_number, None);
        assert_eq!(reference.column, 0);
        assert!(!reference.has_context());
    }

    #[test]
    fn test_strength_level_bands() {
        assert_eq!(StrengthLevel::from_score(0.7), StrengthLevel::Strong);
        assert_eq!(StrengthLevel::from_score(0.69), StrengthLevel::Moderate);
        assert_eq!(StrengthLevel::from_score(0.4), StrengthLevel::Moderate);
        assert_eq!(StrengthLevel::from_score(0.1), StrengthLevel::Weak);
        assert_eq!(StrengthLevel::from_score(0.05), StrengthLevel::Minimal);
        assert!(StrengthLevel::Strong > StrengthLevel::Weak);

        let json = serde_json::to_string(&StrengthLevel::Moderate).unwrap();
        assert_eq!(json, "\"MODERATE\"");
    }

    #[test]
    fn test_candidate_omits_pair_fields_when_absent() {
        let candidate = RelationshipCandidate::new("EMPLOYEES", RelationTarget::Column("SALARY".into()));
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(!json.contains("shared_columns"));
        assert!(!json.contains("strength"));
    }

    #[test]
    fn test_relation_target_serialization() {
        let target = RelationTarget::Column("SALARY".to_string());
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"kind":"column","name":"SALARY"}"#);
        assert!(target.is_column());
        assert_eq!(target.name(), "SALARY");
    }

    #[test]
    fn test_candidate_record_and_merge() {
        let mut a = RelationshipCandidate::new("EMPLOYEES", RelationTarget::Object("DEPARTMENTS".into()));
        a.record(40, 0.5, ContextZone::After, 3.0);
        a.record(10, 0.9, ContextZone::Line, 3.0);

        assert_eq!(a.cooccurrences, 2);
        assert!((a.score - 4.2).abs() < 1e-9);
        assert_eq!(a.min_distance, 10);
        assert!((a.best_proximity - 0.9).abs() < 1e-9);
        assert!((a.zone_scores.get(ContextZone::After) - 1.5).abs() < 1e-9);

        let mut b = RelationshipCandidate::new("EMPLOYEES", RelationTarget::Object("DEPARTMENTS".into()));
        b.record(5, 0.95, ContextZone::Before, 1.0);
        a.merge(&b);

        assert_eq!(a.cooccurrences, 3);
        assert_eq!(a.files, 2);
        assert_eq!(a.min_distance, 5);
        assert!((a.zone_scores.get(ContextZone::Before) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_summary_success_rate() {
        let empty = AnalysisSummary::default();
        assert_eq!(empty.success_rate(), 0.0);

        let summary = AnalysisSummary {
            objects_analyzed: 4,
            objects_with_relationships: 1,
            ..Default::default()
        };
        assert!((summary.success_rate() - 0.25).abs() < 1e-9);
    }
}
