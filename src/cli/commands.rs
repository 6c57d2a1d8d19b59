//! Command implementations for CLI operations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use crate::proximity::{ContextWeights, ProximityConfig, ProximityEngine};
use crate::report::format_report_markdown;
use crate::scan::DEFAULT_CONTEXT_LINES;
use crate::types::Reference;
use crate::{scan_corpus, ScanConfig};

use super::io_utils::{canonicalize_path, load_catalog, write_output};

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Named context weighting schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WeightPreset {
    /// line=3, before=1, after=3
    #[default]
    Trailing,
    /// line=3, before=3, after=1
    Leading,
}

impl WeightPreset {
    pub fn weights(self) -> ContextWeights {
        match self {
            WeightPreset::Trailing => ContextWeights::TRAILING,
            WeightPreset::Leading => ContextWeights::LEADING,
        }
    }
}

/// Options for the analyze command
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub metadata: PathBuf,
    pub root: String,
    pub max_distance: u64,
    /// Explicit weights override the preset
    pub weights: Option<ContextWeights>,
    pub preset: WeightPreset,
    pub top_n: usize,
    pub min_cooccurrence: u64,
    pub min_strength: f64,
    pub context_lines: usize,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub case_sensitive: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        let proximity = ProximityConfig::default();
        Self {
            metadata: PathBuf::from("tables_views.json"),
            root: ".".to_string(),
            max_distance: proximity.max_distance,
            weights: None,
            preset: WeightPreset::default(),
            top_n: proximity.top_n,
            min_cooccurrence: proximity.min_cooccurrence,
            min_strength: proximity.min_strength,
            context_lines: DEFAULT_CONTEXT_LINES,
            format: OutputFormat::default(),
            output: None,
            case_sensitive: false,
        }
    }
}

impl AnalyzeOptions {
    pub fn proximity_config(&self) -> ProximityConfig {
        ProximityConfig {
            max_distance: self.max_distance,
            weights: self.weights.unwrap_or_else(|| self.preset.weights()),
            top_n: self.top_n,
            min_cooccurrence: self.min_cooccurrence,
            min_strength: self.min_strength,
            ..Default::default()
        }
    }
}

/// Scan a source tree and report relationships between schema objects
pub fn analyze_command(options: &AnalyzeOptions) -> Result<()> {
    let report = run_analysis(options)?;
    write_output(options.output.as_deref(), &report)
}

/// Run the full pipeline and render the report
pub fn run_analysis(options: &AnalyzeOptions) -> Result<String> {
    let config = options.proximity_config();
    let engine = ProximityEngine::new(config).context("Invalid analysis settings")?;

    let catalog = load_catalog(&options.metadata)?;
    let matcher = catalog.identifier_matcher();

    let scan_config = ScanConfig {
        root: canonicalize_path(&options.root)?,
        context_lines: options.context_lines,
        case_sensitive: options.case_sensitive,
        ..Default::default()
    };
    let scanned = scan_corpus(&matcher, &scan_config)?;

    let analysis = engine.analyze(&scanned.references, &catalog);
    info!(
        "{} of {} objects have relationships",
        analysis.summary.objects_with_relationships, analysis.summary.objects_analyzed
    );

    match options.format {
        OutputFormat::Markdown => Ok(format_report_markdown(&analysis, engine.config())),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")
        }
    }
}

/// List every mention of a schema object under a path
pub fn scan_command(metadata: &Path, path: &str, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(metadata)?;
    let matcher = catalog.identifier_matcher();

    let config = ScanConfig {
        root: canonicalize_path(path)?,
        ..Default::default()
    };
    let scanned = scan_corpus(&matcher, &config)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&scanned.references)
                .context("Failed to serialize references")?;
            println!("{}", json);
        }
        OutputFormat::Markdown => {
            if scanned.references.is_empty() {
                println!("No schema objects mentioned under {}", path);
                return Ok(());
            }
            println!(
                "Found {} mentions in {} files:\n",
                scanned.stats.references, scanned.stats.files_with_matches
            );
            for reference in &scanned.references {
                println!("  {}", format_reference(reference));
            }
        }
    }

    Ok(())
}

/// Print the schema objects found in a string
pub fn match_command(metadata: &Path, text: &str, case_sensitive: bool) -> Result<()> {
    let catalog = load_catalog(metadata)?;
    let matcher = catalog.identifier_matcher();
    let matches = matcher.find_all_with_case(text, case_sensitive);

    if matches.is_empty() {
        println!("No schema objects found");
        return Ok(());
    }

    for m in matches {
        println!("  {} [{}..{}] {:?}", m.identifier, m.start, m.end, &text[m.start..m.end]);
    }

    Ok(())
}

fn format_reference(reference: &Reference) -> String {
    let line = reference.line_number.unwrap_or_default();
    let text = reference.line_text.trim();
    let text = match text.char_indices().nth(80) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    };
    format!(
        "{} - {}:{}:{}  {}",
        reference.object_name,
        reference.file_path,
        line,
        reference.column + 1,
        text
    )
}
