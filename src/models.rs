//! Data types that flow through the generation pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A text file read from the checked-out repository.
#[derive(Debug, Clone)]
pub struct CollectedFile {
    pub path: PathBuf,
    /// Path relative to the repository root, `/`-separated.
    pub relative_path: String,
    pub text: String,
}

/// Files collected for one run, in collection order.
#[derive(Debug, Clone, Default)]
pub struct FileContent {
    files: Vec<CollectedFile>,
}

impl FileContent {
    pub fn new(files: Vec<CollectedFile>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectedFile> {
        self.files.iter()
    }

    /// Concatenate file texts (each truncated to `max_lines` and followed by
    /// a newline), stopping after the file that brings the combined text to
    /// `max_lines` lines or more.
    pub fn combined_text(&self, max_lines: usize) -> String {
        let mut combined = String::new();
        for file in &self.files {
            combined.push_str(&truncate_lines(&file.text, max_lines));
            combined.push('\n');
            if combined.matches('\n').count() + 1 >= max_lines {
                break;
            }
        }
        combined
    }
}

/// Keep the first `max_lines` newline-separated lines of `text`.
pub fn truncate_lines(text: &str, max_lines: usize) -> String {
    text.split('\n')
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A generated question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedExample {
    pub question: String,
    pub answer: String,
}

/// Diagnostic record kept alongside each seed example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub question: String,
    pub answer: String,
    pub score: f64,
}

/// The taxonomy-style output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaDocument {
    pub created_by: String,
    pub domain: String,
    pub seed_examples: Vec<SeedExample>,
    pub task_description: String,
    pub document: SourceDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub repo: String,
    pub commit: String,
    pub patterns: Vec<String>,
}

/// Timings and counts for one pipeline run. Times are seconds; `start_time`
/// and `end_time` are Unix timestamps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    pub repo_url: String,
    pub commit_id: String,
    pub model_name: String,
    pub start_time: f64,
    pub clone_time: f64,
    pub file_count: u64,
    pub file_read_time: f64,
    pub section_extraction_time: f64,
    pub relevant_section_count: u64,
    pub qa_generation_time: f64,
    pub qa_count: u64,
    pub end_time: f64,
    pub total_time: f64,
}

impl RunMetrics {
    pub fn start(repo_url: &str, commit_id: &str, model_name: &str) -> Self {
        Self {
            repo_url: repo_url.to_string(),
            commit_id: commit_id.to_string(),
            model_name: model_name.to_string(),
            start_time: unix_now(),
            ..Default::default()
        }
    }

    pub fn finish(&mut self) {
        self.end_time = unix_now();
        self.total_time = self.end_time - self.start_time;
    }

    /// Numeric fields as `(name, value)` pairs, for gauge export.
    pub fn numeric_samples(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("start_time", self.start_time),
            ("clone_time", self.clone_time),
            ("file_count", self.file_count as f64),
            ("file_read_time", self.file_read_time),
            ("section_extraction_time", self.section_extraction_time),
            ("relevant_section_count", self.relevant_section_count as f64),
            ("qa_generation_time", self.qa_generation_time),
            ("qa_count", self.qa_count as f64),
            ("end_time", self.end_time),
            ("total_time", self.total_time),
        ]
    }
}

fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
