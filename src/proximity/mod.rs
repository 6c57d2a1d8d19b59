//! Proximity relationship engine
//!
//! Turns a flat list of references into scored relationships:
//! - Object pairs mentioned close together in the same file
//! - Columns mentioned near their object, as references of their own or in
//!   the text around an object reference
//!
//! References are grouped by file and sorted by position. The forward scan
//! from each reference stops at the first reference beyond the distance
//! threshold, so the cost per file is bounded by how densely mentions cluster
//! rather than by the square of the reference count. Files are scanned
//! independently and their partial scores summed.

mod config;
mod scoring;

pub use config::{ConfigError, ProximityConfig};
pub use scoring::{proximity_score, relationship_strength, ContextWeights, DECAY_CHARS};

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::matcher::IdentifierMatcher;
use crate::metadata::SchemaCatalog;
use crate::types::{
    AnalysisSummary, ContextZone, ObjectReport, ObjectStatus, Reference, RelationTarget,
    RelationshipAnalysis, RelationshipCandidate, RelationshipColumns,
};

/// Scores relationships between schema objects from their references
#[derive(Debug, Clone)]
pub struct ProximityEngine {
    config: ProximityConfig,
}

impl ProximityEngine {
    pub fn new(config: ProximityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Analyze references against the schema catalog.
    ///
    /// Every catalog object appears in the result, with `NotFound` status when
    /// nothing relates to it. Malformed references are skipped and counted.
    pub fn analyze(&self, references: &[Reference], catalog: &SchemaCatalog) -> RelationshipAnalysis {
        let (files, skipped) = self.group_by_file(references);
        info!(
            "Analyzing {} references across {} files",
            references.len() as u64 - skipped,
            files.len()
        );

        let column_matchers = column_matchers(&files, catalog);
        let context_objects = context_object_matcher(&files, catalog);
        let matchers = ContextMatchers {
            columns: &column_matchers,
            objects: &context_objects,
        };

        let tally = files
            .into_par_iter()
            .map(|(_, refs)| self.scan_file(refs, catalog, &matchers))
            .reduce(Tally::default, Tally::merge);

        if skipped > 0 || tally.negative_distances > 0 {
            warn!(
                "Skipped {} malformed references and {} inconsistent distances",
                skipped, tally.negative_distances
            );
        }

        let analysis = self.finalize(tally, skipped, catalog);
        info!(
            "Found relationships for {}/{} objects ({} co-occurrences, {} column mentions)",
            analysis.summary.objects_with_relationships,
            analysis.summary.objects_analyzed,
            analysis.summary.total_cooccurrences,
            analysis.summary.column_mentions
        );
        analysis
    }

    /// Validate references and bucket them by file path
    fn group_by_file<'a>(&self, references: &'a [Reference]) -> (Vec<(&'a str, Vec<Located<'a>>)>, u64) {
        let mut by_file: HashMap<&str, Vec<Located>> = HashMap::new();
        let mut skipped = 0;

        for reference in references {
            let line = match reference.validate() {
                Ok(line) => line,
                Err(reason) => {
                    debug!(
                        "Skipping reference to '{}' in '{}': {}",
                        reference.object_name, reference.file_path, reason
                    );
                    skipped += 1;
                    continue;
                }
            };

            by_file
                .entry(reference.file_path.as_str())
                .or_default()
                .push(Located {
                    reference,
                    name: reference.object_name.trim().to_uppercase(),
                    line,
                    position: self.position(reference, line),
                });
        }

        let mut files: Vec<_> = by_file.into_iter().collect();
        files.sort_by(|a, b| a.0.cmp(b.0));
        (files, skipped)
    }

    /// Character position of a reference within its file
    fn position(&self, reference: &Reference, line: u32) -> u64 {
        match reference.char_offset {
            Some(offset) => offset,
            None => {
                let per_line = self.config.chars_per_line;
                u64::from(line - 1) * per_line + u64::from(reference.column).min(per_line - 1)
            }
        }
    }

    fn scan_file(&self, mut refs: Vec<Located>, catalog: &SchemaCatalog, matchers: &ContextMatchers) -> Tally {
        let mut tally = Tally {
            files: 1,
            ..Default::default()
        };

        refs.sort_by_key(|r| (r.line, r.reference.column, r.position));

        for located in &refs {
            if catalog.is_column_only(&located.name) {
                continue;
            }
            tally.referenced.insert(located.name.clone());
            if let Some(columns) = matchers.columns.get(&located.name) {
                self.scan_context_columns(located, columns, matchers.objects, &mut tally);
            }
        }

        let distinct: HashSet<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        if distinct.len() < 2 {
            tally.single_object_files = 1;
            return tally;
        }

        let max_distance = i128::from(self.config.max_distance);
        for (i, anchor) in refs.iter().enumerate() {
            for other in &refs[i + 1..] {
                let gap = i128::from(other.position) - i128::from(anchor.position);
                // Sorted by position, so everything after this is farther away
                if gap > max_distance {
                    break;
                }
                let distance = same_line_distance(anchor, other).unwrap_or(gap);
                if distance > max_distance {
                    continue;
                }
                if distance < 0 {
                    tally.negative_distances += 1;
                    continue;
                }
                self.record_pair(anchor, other, distance as u64, catalog, &mut tally);
            }
        }

        tally
    }

    /// Record a pair of references, `anchor` being the earlier one
    fn record_pair(
        &self,
        anchor: &Located,
        other: &Located,
        distance: u64,
        catalog: &SchemaCatalog,
        tally: &mut Tally,
    ) {
        if anchor.name == other.name {
            return;
        }

        // Zone of each mention as seen from the other one
        let (later, earlier) = if anchor.line == other.line {
            (ContextZone::Line, ContextZone::Line)
        } else {
            (ContextZone::After, ContextZone::Before)
        };
        let weights = &self.config.weights;

        if catalog.is_column_of(&anchor.name, &other.name) {
            tally.record_column(&anchor.name, &other.name, distance, later, weights);
        } else if catalog.is_column_of(&other.name, &anchor.name) {
            tally.record_column(&other.name, &anchor.name, distance, earlier, weights);
        } else if !catalog.is_column_only(&anchor.name) && !catalog.is_column_only(&other.name) {
            tally.cooccurrences += 1;
            tally.record_object(&anchor.name, &other.name, distance, later, weights);
            tally.record_object(&other.name, &anchor.name, distance, earlier, weights);
        }
    }

    /// Credit columns mentioned in the text around an object reference, both to
    /// the object and to each other object mentioned in the same text
    fn scan_context_columns(
        &self,
        located: &Located,
        matcher: &IdentifierMatcher,
        objects: &IdentifierMatcher,
        tally: &mut Tally,
    ) {
        let reference = located.reference;
        if !reference.has_context() {
            return;
        }

        let text = ContextText::new(reference);

        let related: BTreeSet<String> = objects
            .find_all(&text.combined)
            .into_iter()
            .map(|m| m.identifier)
            .filter(|name| *name != located.name)
            .collect();
        for name in &related {
            *tally
                .pair_documents
                .entry((located.name.clone(), name.clone()))
                .or_default() += 1;
        }

        let matches = matcher.find_all(&text.combined);

        let mut object_positions = Vec::new();
        let mut column_mentions = Vec::new();
        let mut cursor_byte = 0;
        let mut cursor_char = 0;

        for m in &matches {
            cursor_char += text.combined[cursor_byte..m.start].chars().count();
            cursor_byte = m.start;

            if m.identifier == located.name {
                object_positions.push(cursor_char);
            } else {
                column_mentions.push((m, cursor_char));
            }
        }

        if column_mentions.is_empty() {
            return;
        }
        if object_positions.is_empty() {
            object_positions.push(text.line_start_chars + reference.column as usize);
        }

        for (m, position) in column_mentions {
            let Some(distance) = object_positions.iter().map(|&p| p.abs_diff(position)).min() else {
                continue;
            };
            let distance = distance as u64;
            if distance > self.config.max_distance {
                continue;
            }
            let zone = text.zone_of(m.start);
            let weights = &self.config.weights;
            tally.record_column(&located.name, &m.identifier, distance, zone, weights);

            for name in &related {
                let pair = tally
                    .pair_columns
                    .entry((located.name.clone(), name.clone()))
                    .or_default();
                let target = RelationTarget::Column(m.identifier.clone());
                record(pair, &located.name, target, distance, zone, weights);
            }
        }
    }

    /// Rank candidates and build per-object reports
    fn finalize(&self, tally: Tally, skipped: u64, catalog: &SchemaCatalog) -> RelationshipAnalysis {
        let pair_columns: HashMap<(String, String), Vec<RelationshipCandidate>> = tally
            .pair_columns
            .into_iter()
            .map(|(pair, columns)| {
                let mut columns: Vec<_> = columns.into_values().collect();
                columns.sort_by(rank_order);
                (pair, columns)
            })
            .collect();

        let candidates = tally.objects.len();
        let mut global_relationships: Vec<_> = tally
            .objects
            .into_values()
            .filter(|candidate| candidate.cooccurrences >= self.config.min_cooccurrence)
            .map(|candidate| assess(candidate, catalog, &pair_columns))
            .filter(|candidate| {
                candidate
                    .strength
                    .as_ref()
                    .is_some_and(|strength| strength.overall >= self.config.min_strength)
            })
            .collect();
        if global_relationships.len() < candidates {
            debug!(
                "Dropped {} object relationships below the co-occurrence or strength minimum",
                candidates - global_relationships.len()
            );
        }

        let mut global_columns: Vec<_> = tally.columns.into_values().collect();
        global_relationships.sort_by(rank_order);
        global_columns.sort_by(rank_order);

        let (relationship_columns, mut global_relationship_columns) =
            self.relationship_columns(&global_relationships, tally.pair_documents, &pair_columns);

        let mut related_by_subject = group_by_subject(&global_relationships);
        let mut columns_by_subject = group_by_subject(&global_columns);

        let names: BTreeSet<String> = catalog
            .objects()
            .map(str::to_string)
            .chain(tally.referenced)
            .collect();

        let mut objects = Vec::with_capacity(names.len());
        let mut found = 0;

        for name in names {
            let mut related_objects = related_by_subject.remove(&name).unwrap_or_default();
            let mut top_columns = columns_by_subject.remove(&name).unwrap_or_default();

            if related_objects.is_empty() && top_columns.is_empty() {
                objects.push(ObjectReport::not_found(name));
                continue;
            }

            found += 1;
            let score: f64 = related_objects.iter().chain(&top_columns).map(|c| c.score).sum();
            related_objects.truncate(self.config.top_n);
            top_columns.truncate(self.config.top_n);

            objects.push(ObjectReport {
                object: name,
                status: ObjectStatus::Found,
                score,
                related_objects,
                top_columns,
            });
        }

        global_relationships.truncate(self.config.global_top);
        global_columns.truncate(self.config.global_top);
        global_relationship_columns.truncate(self.config.global_top);

        let summary = AnalysisSummary {
            objects_analyzed: objects.len() as u64,
            objects_with_relationships: found,
            total_cooccurrences: tally.cooccurrences,
            column_mentions: tally.column_mentions,
            files_analyzed: tally.files,
            files_single_object: tally.single_object_files,
            skipped_references: skipped,
            inconsistent_distances: tally.negative_distances,
        };

        RelationshipAnalysis {
            objects,
            global_relationships,
            global_columns,
            relationship_columns,
            global_relationship_columns,
            summary,
        }
    }

    /// Top columns per kept relationship, plus their `object.column` totals ranked
    fn relationship_columns(
        &self,
        kept: &[RelationshipCandidate],
        documents: HashMap<(String, String), u64>,
        pair_columns: &HashMap<(String, String), Vec<RelationshipCandidate>>,
    ) -> (Vec<RelationshipColumns>, Vec<RelationshipCandidate>) {
        let mut breakdowns = Vec::new();
        let mut totals = CandidateMap::new();

        for candidate in kept {
            let pair = (candidate.subject.clone(), candidate.target.name().to_string());
            let Some(&count) = documents.get(&pair) else {
                continue;
            };

            let mut columns = pair_columns.get(&pair).cloned().unwrap_or_default();
            columns.truncate(self.config.top_n);
            for column in &columns {
                let key = (column.subject.clone(), column.target.name().to_string());
                match totals.entry(key) {
                    Entry::Occupied(mut entry) => entry.get_mut().merge(column),
                    Entry::Vacant(entry) => {
                        entry.insert(column.clone());
                    }
                }
            }

            let (subject, related) = pair;
            breakdowns.push(RelationshipColumns {
                subject,
                related,
                documents: count,
                columns,
            });
        }

        breakdowns.sort_by(|a, b| (&a.subject, &a.related).cmp(&(&b.subject, &b.related)));
        let mut totals: Vec<_> = totals.into_values().collect();
        totals.sort_by(rank_order);
        (breakdowns, totals)
    }
}

/// Attach shared columns and an overall strength to an object relationship
fn assess(
    mut candidate: RelationshipCandidate,
    catalog: &SchemaCatalog,
    pair_columns: &HashMap<(String, String), Vec<RelationshipCandidate>>,
) -> RelationshipCandidate {
    let subject = candidate.subject.clone();
    let related = candidate.target.name().to_string();

    let shared = catalog.shared_columns(&subject, &related);
    let cross = cross_column_pairs(
        pair_columns.get(&(subject.clone(), related.clone())),
        pair_columns.get(&(related, subject)),
    );

    candidate.strength = Some(relationship_strength(candidate.cooccurrences, &shared, cross));
    candidate.shared_columns = Some(shared);
    candidate
}

/// Distinct pairs of differently named columns, one from each side of a relationship
fn cross_column_pairs(
    subject: Option<&Vec<RelationshipCandidate>>,
    related: Option<&Vec<RelationshipCandidate>>,
) -> usize {
    let (Some(subject), Some(related)) = (subject, related) else {
        return 0;
    };
    subject
        .iter()
        .map(|left| {
            related
                .iter()
                .filter(|right| right.target.name() != left.target.name())
                .count()
        })
        .sum()
}

/// Column distance for two references on the same line without explicit offsets.
/// Line-based positions clamp the column, so they cannot separate such mentions.
fn same_line_distance(anchor: &Located, other: &Located) -> Option<i128> {
    let no_offsets = anchor.reference.char_offset.is_none() && other.reference.char_offset.is_none();
    (anchor.line == other.line && no_offsets)
        .then(|| i128::from(anchor.reference.column.abs_diff(other.reference.column)))
}

/// Identifier matchers shared by every file's context scan
struct ContextMatchers<'a> {
    /// Per object: its columns plus its own name
    columns: &'a HashMap<String, IdentifierMatcher>,
    /// Every object name, to find which objects share a reference's text
    objects: &'a IdentifierMatcher,
}

/// A validated reference with its position in the file
struct Located<'a> {
    reference: &'a Reference,
    /// Upper-cased identifier, matching the catalog's spelling
    name: String,
    line: u32,
    position: u64,
}

type CandidateMap = HashMap<(String, String), RelationshipCandidate>;

/// Partial results for one or more files
#[derive(Default)]
struct Tally {
    objects: CandidateMap,
    columns: CandidateMap,
    referenced: HashSet<String>,
    cooccurrences: u64,
    column_mentions: u64,
    negative_distances: u64,
    files: u64,
    single_object_files: u64,
    /// (subject, related) to the number of subject references whose text mentions both
    pair_documents: HashMap<(String, String), u64>,
    /// (subject, related) to the subject's columns mentioned in that shared text
    pair_columns: HashMap<(String, String), CandidateMap>,
}

impl Tally {
    fn record_object(
        &mut self,
        subject: &str,
        related: &str,
        distance: u64,
        zone: ContextZone,
        weights: &ContextWeights,
    ) {
        let target = RelationTarget::Object(related.to_string());
        record(&mut self.objects, subject, target, distance, zone, weights);
    }

    fn record_column(
        &mut self,
        subject: &str,
        column: &str,
        distance: u64,
        zone: ContextZone,
        weights: &ContextWeights,
    ) {
        self.column_mentions += 1;
        let target = RelationTarget::Column(column.to_string());
        record(&mut self.columns, subject, target, distance, zone, weights);
    }

    fn merge(mut self, other: Tally) -> Tally {
        merge_candidates(&mut self.objects, other.objects);
        merge_candidates(&mut self.columns, other.columns);
        self.referenced.extend(other.referenced);
        self.cooccurrences += other.cooccurrences;
        self.column_mentions += other.column_mentions;
        self.negative_distances += other.negative_distances;
        self.files += other.files;
        self.single_object_files += other.single_object_files;
        for (pair, count) in other.pair_documents {
            *self.pair_documents.entry(pair).or_default() += count;
        }
        for (pair, columns) in other.pair_columns {
            merge_candidates(self.pair_columns.entry(pair).or_default(), columns);
        }
        self
    }
}

fn record(
    map: &mut CandidateMap,
    subject: &str,
    target: RelationTarget,
    distance: u64,
    zone: ContextZone,
    weights: &ContextWeights,
) {
    let key = (subject.to_string(), target.name().to_string());
    map.entry(key)
        .or_insert_with(|| RelationshipCandidate::new(subject, target))
        .record(distance, proximity_score(distance), zone, weights.weight(zone));
}

fn merge_candidates(into: &mut CandidateMap, from: CandidateMap) {
    for (key, candidate) in from {
        match into.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(&candidate),
            Entry::Vacant(entry) => {
                entry.insert(candidate);
            }
        }
    }
}

/// Highest score first, then by name for a stable order
fn rank_order(a: &RelationshipCandidate, b: &RelationshipCandidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.subject.cmp(&b.subject))
        .then_with(|| a.target.cmp(&b.target))
}

/// Split ranked candidates per subject, keeping rank order
fn group_by_subject(ranked: &[RelationshipCandidate]) -> HashMap<String, Vec<RelationshipCandidate>> {
    let mut grouped: HashMap<String, Vec<RelationshipCandidate>> = HashMap::new();
    for candidate in ranked {
        grouped
            .entry(candidate.subject.clone())
            .or_default()
            .push(candidate.clone());
    }
    grouped
}

/// Column matchers for every referenced object that has context text and known columns
fn column_matchers(
    files: &[(&str, Vec<Located>)],
    catalog: &SchemaCatalog,
) -> HashMap<String, IdentifierMatcher> {
    let mut matchers = HashMap::new();
    for located in files.iter().flat_map(|(_, refs)| refs) {
        if matchers.contains_key(&located.name)
            || !located.reference.has_context()
            || catalog.columns(&located.name).is_empty()
        {
            continue;
        }
        matchers.insert(located.name.clone(), catalog.column_matcher(&located.name));
    }
    matchers
}

/// Matcher over every object a reference's context text could mention
fn context_object_matcher(files: &[(&str, Vec<Located>)], catalog: &SchemaCatalog) -> IdentifierMatcher {
    let mut matcher = catalog.identifier_matcher();
    matcher.extend(
        files
            .iter()
            .flat_map(|(_, refs)| refs)
            .filter(|located| !catalog.is_column_only(&located.name))
            .map(|located| located.name.as_str()),
    );
    matcher
}

/// Context lines, matched line and following lines joined into one string
struct ContextText {
    combined: String,
    before: Range<usize>,
    line: Range<usize>,
    line_start_chars: usize,
}

impl ContextText {
    fn new(reference: &Reference) -> Self {
        let mut combined = String::new();
        let before = push_segment(&mut combined, &reference.context_before.join(" "));
        let line = push_segment(&mut combined, &reference.line_text);
        push_segment(&mut combined, &reference.context_after.join(" "));

        let line_start_chars = combined[..line.start].chars().count();
        Self {
            combined,
            before,
            line,
            line_start_chars,
        }
    }

    fn zone_of(&self, byte: usize) -> ContextZone {
        if self.before.contains(&byte) {
            ContextZone::Before
        } else if self.line.contains(&byte) {
            ContextZone::Line
        } else {
            ContextZone::After
        }
    }
}

fn push_segment(combined: &mut String, segment: &str) -> Range<usize> {
    if segment.is_empty() {
        return combined.len()..combined.len();
    }
    if !combined.is_empty() {
        combined.push(' ');
    }
    let start = combined.len();
    combined.push_str(segment);
    start..combined.len()
}
