//! Report rendering
//!
//! Formats a relationship analysis as Markdown for reading. JSON output is
//! the serde serialization of [`RelationshipAnalysis`] itself.

use crate::proximity::ProximityConfig;
use crate::types::{ContextZone, ObjectStatus, RelationshipAnalysis, RelationshipCandidate};

/// Render an analysis as a Markdown report
pub fn format_report_markdown(analysis: &RelationshipAnalysis, config: &ProximityConfig) -> String {
    let mut output = String::new();
    let summary = &analysis.summary;

    output.push_str("# Schema Relationship Analysis\n\n");

    output.push_str("## Summary\n\n");
    output.push_str(&format!("- Objects analyzed: {}\n", summary.objects_analyzed));
    output.push_str(&format!(
        "- Objects with relationships: {} ({:.1}%)\n",
        summary.objects_with_relationships,
        summary.success_rate() * 100.0
    ));
    output.push_str(&format!("- Object co-occurrences: {}\n", summary.total_cooccurrences));
    output.push_str(&format!("- Column mentions: {}\n", summary.column_mentions));
    output.push_str(&format!(
        "- Files analyzed: {} ({} with a single object)\n",
        summary.files_analyzed, summary.files_single_object
    ));
    if summary.skipped_references > 0 {
        output.push_str(&format!("- Skipped references: {}\n", summary.skipped_references));
    }
    if summary.inconsistent_distances > 0 {
        output.push_str(&format!(
            "- Inconsistent distances: {}\n",
            summary.inconsistent_distances
        ));
    }

    output.push_str("\n## Scoring\n\n");
    output.push_str(&format!(
        "- Distance threshold: {} characters\n",
        config.max_distance
    ));
    output.push_str("- Proximity: e^(-distance/100)\n");
    output.push_str(&format!("- Context weights: {}\n", config.weights));
    if config.min_cooccurrence > 1 {
        output.push_str(&format!("- Minimum co-occurrences: {}\n", config.min_cooccurrence));
    }
    if config.min_strength > 0.0 {
        output.push_str(&format!("- Minimum strength: {:.2}\n", config.min_strength));
    }

    if !analysis.global_relationships.is_empty() {
        output.push_str("\n## Top Relationships\n\n");
        for (rank, candidate) in analysis.global_relationships.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", rank + 1, format_global(candidate)));
        }
    }

    if !analysis.global_columns.is_empty() {
        output.push_str("\n## Top Columns\n\n");
        for (rank, candidate) in analysis.global_columns.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", rank + 1, format_global(candidate)));
        }
    }

    if !analysis.global_relationship_columns.is_empty() {
        output.push_str("\n## Top Relationship Columns\n\n");
        for (rank, candidate) in analysis.global_relationship_columns.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", rank + 1, format_global(candidate)));
        }
    }

    let found: Vec<_> = analysis
        .objects
        .iter()
        .filter(|report| report.status == ObjectStatus::Found)
        .collect();
    if !found.is_empty() {
        output.push_str("\n## Objects\n");
        for report in found {
            output.push_str(&format!("\n### {} (score {:.3})\n\n", report.object, report.score));

            if !report.related_objects.is_empty() {
                output.push_str("Related objects:\n\n");
                for candidate in &report.related_objects {
                    output.push_str(&format!("- {}\n", format_candidate(candidate)));
                    if let Some(join) = format_join(candidate) {
                        output.push_str(&format!("  - {}\n", join));
                    }
                    let breakdown =
                        analysis.relationship_columns(&report.object, candidate.target.name());
                    if let Some(breakdown) = breakdown.filter(|b| !b.columns.is_empty()) {
                        let columns: Vec<String> = breakdown
                            .columns
                            .iter()
                            .map(|c| format!("`{}` {:.3}", c.target.name(), c.score))
                            .collect();
                        output.push_str(&format!(
                            "  - columns in {} shared contexts: {}\n",
                            breakdown.documents,
                            columns.join(", ")
                        ));
                    }
                }
                output.push('\n');
            }

            if !report.top_columns.is_empty() {
                output.push_str("Columns:\n\n");
                for candidate in &report.top_columns {
                    output.push_str(&format!("- {}\n", format_candidate(candidate)));
                }
                output.push('\n');
            }
        }
    }

    let not_found: Vec<_> = analysis
        .objects
        .iter()
        .filter(|report| report.status == ObjectStatus::NotFound)
        .map(|report| format!("`{}`", report.object))
        .collect();
    if !not_found.is_empty() {
        output.push_str(&format!("\n## Not Found ({})\n\n", not_found.len()));
        output.push_str(&not_found.join(", "));
        output.push('\n');
    }

    output
}

fn format_global(candidate: &RelationshipCandidate) -> String {
    let arrow = if candidate.target.is_column() { "." } else { " -> " };
    format!(
        "`{}{}{}` score {:.3} ({} mentions, {} files)",
        candidate.subject,
        arrow,
        candidate.target.name(),
        candidate.score,
        candidate.cooccurrences,
        candidate.files
    )
}

fn format_join(candidate: &RelationshipCandidate) -> Option<String> {
    let strength = candidate.strength.as_ref()?;
    let mut join = format!("strength {:.3} ({})", strength.overall, strength.level.as_str());
    if let Some(shared) = candidate.shared_columns.as_ref().filter(|s| !s.columns.is_empty()) {
        join.push_str(&format!(
            ", join keys {} (match {:.2})",
            shared.columns.join(", "),
            shared.match_score
        ));
    }
    Some(join)
}

fn format_candidate(candidate: &RelationshipCandidate) -> String {
    let zones: Vec<String> = ContextZone::ALL
        .iter()
        .filter_map(|&zone| {
            let score = candidate.zone_scores.get(zone);
            (score > 0.0).then(|| format!("{}={:.3}", zone.as_str(), score))
        })
        .collect();

    format!(
        "`{}` score {:.3}, {} mentions, best proximity {:.3}, min distance {} [{}]",
        candidate.target.name(),
        candidate.score,
        candidate.cooccurrences,
        candidate.best_proximity,
        candidate.min_distance,
        zones.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AnalysisSummary, ObjectReport, RelationTarget, RelationshipColumns, RelationshipStrength,
        SharedColumns, StrengthLevel,
    };

    fn candidate(subject: &str, target: RelationTarget, distance: u64) -> RelationshipCandidate {
        let mut candidate = RelationshipCandidate::new(subject, target);
        let proximity = crate::proximity::proximity_score(distance);
        candidate.record(distance, proximity, ContextZone::After, 3.0);
        candidate
    }

    fn sample() -> RelationshipAnalysis {
        let mut related = candidate("EMPLOYEES", RelationTarget::Object("DEPARTMENTS".into()), 40);
        related.shared_columns = Some(SharedColumns {
            columns: vec!["DEPARTMENT_ID".into()],
            match_score: 0.5,
        });
        related.strength = Some(RelationshipStrength {
            overall: 0.45,
            level: StrengthLevel::Moderate,
            cooccurrence_score: 0.1,
            column_score: 0.5,
            exact_match_score: 0.2,
            cross_column_score: 0.0,
        });
        let column = candidate("EMPLOYEES", RelationTarget::Column("SALARY".into()), 10);
        let found = ObjectReport {
            object: "EMPLOYEES".into(),
            status: ObjectStatus::Found,
            score: related.score + column.score,
            related_objects: vec![related.clone()],
            top_columns: vec![column.clone()],
        };

        RelationshipAnalysis {
            objects: vec![found, ObjectReport::not_found("AUDIT_LOG")],
            global_relationships: vec![related],
            global_columns: vec![column.clone()],
            relationship_columns: vec![RelationshipColumns {
                subject: "EMPLOYEES".into(),
                related: "DEPARTMENTS".into(),
                documents: 2,
                columns: vec![column.clone()],
            }],
            global_relationship_columns: vec![column],
            summary: AnalysisSummary {
                objects_analyzed: 2,
                objects_with_relationships: 1,
                total_cooccurrences: 1,
                column_mentions: 1,
                files_analyzed: 1,
                files_single_object: 0,
                skipped_references: 0,
                inconsistent_distances: 2,
            },
        }
    }

    #[test]
    fn test_markdown_sections() {
        let markdown = format_report_markdown(&sample(), &ProximityConfig::default());

        assert!(markdown.starts_with("# Schema Relationship Analysis"));
        assert!(markdown.contains("- Objects with relationships: 1 (50.0%)"));
        assert!(markdown.contains("line_text=3x, context_before=1x, context_after=3x"));
        assert!(markdown.contains("1. `EMPLOYEES -> DEPARTMENTS`"));
        assert!(markdown.contains("1. `EMPLOYEES.SALARY`"));
        assert!(markdown.contains("### EMPLOYEES"));
        assert!(markdown.contains("min distance 40 [context_after="));
        assert!(markdown.contains("## Not Found (1)"));
        assert!(markdown.contains("`AUDIT_LOG`"));
        assert!(!markdown.contains("Skipped references"));
        assert!(markdown.contains("- Inconsistent distances: 2"));
    }

    #[test]
    fn test_markdown_relationship_details() {
        let markdown = format_report_markdown(&sample(), &ProximityConfig::default());

        assert!(markdown.contains("  - strength 0.450 (MODERATE), join keys DEPARTMENT_ID (match 0.50)"));
        assert!(markdown.contains("  - columns in 2 shared contexts: `SALARY` "));
        assert!(markdown.contains("## Top Relationship Columns\n\n1. `EMPLOYEES.SALARY`"));
        assert!(!markdown.contains("Minimum strength"));

        let config = ProximityConfig {
            min_cooccurrence: 2,
            min_strength: 0.1,
            ..Default::default()
        };
        let markdown = format_report_markdown(&sample(), &config);
        assert!(markdown.contains("- Minimum co-occurrences: 2"));
        assert!(markdown.contains("- Minimum strength: 0.10"));
    }

    #[test]
    fn test_empty_analysis() {
        let analysis = RelationshipAnalysis {
            objects: Vec::new(),
            global_relationships: Vec::new(),
            global_columns: Vec::new(),
            relationship_columns: Vec::new(),
            global_relationship_columns: Vec::new(),
            summary: AnalysisSummary::default(),
        };
        let markdown = format_report_markdown(&analysis, &ProximityConfig::default());

        assert!(markdown.contains("- Objects analyzed: 0"));
        assert!(!markdown.contains("## Top Relationships"));
        assert!(!markdown.contains("## Not Found"));
        assert!(!markdown.contains("Inconsistent distances"));
        assert!(!markdown.contains("## Top Relationship Columns"));
    }

    #[test]
    fn test_json_roundtrip_keeps_target_kind() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains(r#""target":{"kind":"column","name":"SALARY"}"#));

        let parsed: RelationshipAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary, sample().summary);
        assert_eq!(parsed.objects[1].status, ObjectStatus::NotFound);
        assert!(json.contains(r#""level":"MODERATE""#));
        assert_eq!(parsed.relationship_columns, sample().relationship_columns);
        assert!(parsed.objects[0].top_columns[0].strength.is_none());
    }
}
