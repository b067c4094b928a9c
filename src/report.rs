//! Output writers: seed-example YAML, score and metrics CSVs, and the
//! terminal listing of accepted pairs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::config::{Config, OutputFormat};
use crate::models::{QnaDocument, RunMetrics, ScoreRecord, SeedExample, SourceDocument};
use crate::text::word_count;

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// Write seed examples to `path` in the configured format, creating parent
/// directories as needed.
pub fn write_seed_yaml(path: &Path, examples: &[SeedExample], config: &Config) -> Result<()> {
    let yaml = match config.output.format {
        OutputFormat::List => serde_yaml::to_string(examples)?,
        OutputFormat::Taxonomy => serde_yaml::to_string(&QnaDocument {
            created_by: config.output.created_by.clone(),
            domain: config.domain(),
            seed_examples: examples.to_vec(),
            task_description: config.task_description(),
            document: SourceDocument {
                repo: config.repo_url.clone(),
                commit: config.commit_id.clone(),
                patterns: config.patterns.clone(),
            },
        })?,
    };

    ensure_parent(path)?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Q&A pairs saved to {}", path.display());
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    List(Vec<SeedExample>),
    Document(QnaDocument),
}

/// Read seed examples back from either output format.
pub fn read_seed_yaml(path: &Path) -> Result<Vec<SeedExample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: SeedFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(match parsed {
        SeedFile::List(list) => list,
        SeedFile::Document(doc) => doc.seed_examples,
    })
}

pub fn write_scores_csv(path: &Path, scores: &[ScoreRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in scores {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Scores saved to {}", path.display());
    Ok(())
}

pub fn write_metrics_csv(path: &Path, metrics: &RunMetrics) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.serialize(metrics)?;
    writer.flush()?;
    info!("Metrics saved to {}", path.display());
    Ok(())
}

/// Print accepted pairs to stdout; coloured when stdout is a terminal.
pub fn print_results(examples: &[SeedExample], min_words: usize, model: &str) -> Result<()> {
    let color = use_color(
        atty::is(atty::Stream::Stdout),
        std::env::var_os("NO_COLOR").as_deref(),
    );
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_results(&mut out, examples, min_words, model, color)
}

/// Colour only on a terminal, and never when `NO_COLOR` is set to a
/// non-empty value.
fn use_color(is_tty: bool, no_color: Option<&std::ffi::OsStr>) -> bool {
    is_tty && no_color.map_or(true, |v| v.is_empty())
}

fn write_results(
    out: &mut impl Write,
    examples: &[SeedExample],
    min_words: usize,
    model: &str,
    color: bool,
) -> Result<()> {
    writeln!(out, "results ({})", model)?;
    for example in examples {
        let (start, end) = match (color, word_count(&example.answer) >= min_words) {
            (false, _) => ("", ""),
            (true, true) => (GREEN, RESET),
            (true, false) => (RED, RESET),
        };
        writeln!(
            out,
            "{}Question: {}\nAnswer: {}{}\n",
            start, example.question, example.answer, end
        )?;
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}
