//! Starter configuration generator (`qna init-config`).
//!
//! Clones a repository (unless a clone already exists), derives glob
//! patterns from the file extensions found in the tree, picks the most
//! frequent README words as keywords, and writes a YAML configuration with
//! the default question templates and model list.

use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

use crate::config::{Config, OutputConfig, QaConfig, DEFAULT_MODEL};
use crate::fetch;
use crate::text::content_words;

pub const DEFAULT_PROJECT_NAME: &str = "InstructLab";
pub const DEFAULT_COMMIT_ID: &str = "83d9852ad97c6b27d4b24508f7cfe7ff5dd04d0d";

pub const DEFAULT_QUESTIONS: &[&str] = &[
    "What is {project_name}?",
    "How to get started with {project_name}?",
    "What problems is {project_name} aiming to solve?",
    "Who created {project_name}?",
    "How does {project_name} enable community collaboration?",
    "Is {project_name} an open-source project?",
    "What is the tuning method for {project_name}?",
    "What is the mission of {project_name}?",
    "What technologies or programming languages is {project_name} developed in?",
    "What are the key features of {project_name}?",
    "What are the current limitations of {project_name}?",
    "How can contributors improve {project_name}?",
    "What are the future goals for {project_name}?",
    "How is {project_name} maintained and updated?",
    "What are the recommended best practices for using {project_name}?",
    "What are the main challenges faced by {project_name}?",
];

pub const DEFAULT_MODELS: &[&str] = &[
    "deepset/roberta-base-squad2",
    "bert-large-uncased-whole-word-masking-finetuned-squad",
    "distilbert-base-cased-distilled-squad",
    "albert-base-v2",
    "t5-base",
    "ibm/labradorite-13b",
    "ibm/merlinite-7b",
    "ibm/re2g-reranker-trex",
];

pub struct GenerateOptions {
    pub repo_url: String,
    pub clone_dir: PathBuf,
    pub project_name: String,
    pub commit_id: String,
    pub num_keywords: usize,
    pub output: PathBuf,
}

/// Clone, inspect and write the configuration. Returns the written config.
pub fn run_init_config(opts: &GenerateOptions) -> Result<Config> {
    fetch::clone_if_missing(&opts.repo_url, &opts.clone_dir)?;

    let patterns = find_patterns(&opts.clone_dir)?;
    let keywords = extract_keywords(&opts.clone_dir.join("README.md"), opts.num_keywords);

    let config = starter_config(opts, patterns, keywords);
    write_config(&opts.output, &config)?;

    println!(
        "Repository cloned to '{}' and '{}' generated successfully with dynamic keywords: {:?}.",
        opts.clone_dir.display(),
        opts.output.display(),
        config.keywords
    );
    Ok(config)
}

fn starter_config(opts: &GenerateOptions, patterns: Vec<String>, keywords: Vec<String>) -> Config {
    Config {
        project_name: opts.project_name.clone(),
        repo_url: opts.repo_url.clone(),
        commit_id: opts.commit_id.clone(),
        patterns,
        yaml_path: PathBuf::from("qna.yaml"),
        max_files: 100,
        max_lines: 2000,
        keywords,
        min_sentence_length: 5,
        min_answers: 5,
        questions: DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        taxonomy_dir: Some(PathBuf::from("~/instructlab/taxonomy")),
        model_name: Some(DEFAULT_MODEL.to_string()),
        model_list: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        optimize: false,
        pushgateway_url: None,
        username: None,
        password: None,
        qa: QaConfig::default(),
        output: OutputConfig::default(),
    }
}

/// One pattern per extension found (`*.ext` for the top level, `**/*.ext`
/// when the tree has subdirectories), plus `README.md` when a README exists.
/// Extensionless files and `.git` are ignored.
pub fn find_patterns(base: &Path) -> Result<Vec<String>> {
    let mut extensions = BTreeSet::new();
    let mut has_readme = false;
    let mut max_depth = 0;

    let walker = WalkDir::new(base)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", base.display()))?;
        if entry.file_type().is_dir() {
            max_depth = max_depth.max(entry.depth());
            continue;
        }
        if entry.file_name() == "README.md" {
            has_readme = true;
        }
        if let Some(ext) = entry.path().extension() {
            extensions.insert(ext.to_string_lossy().to_string());
        }
    }

    let mut patterns = BTreeSet::new();
    if has_readme {
        patterns.insert("README.md".to_string());
    }
    for ext in &extensions {
        patterns.insert(format!("*.{}", ext));
        if max_depth > 0 {
            patterns.insert(format!("**/*.{}", ext));
        }
    }

    Ok(patterns.into_iter().collect())
}

/// The `n` most frequent non-stopword words of the README, ties broken by
/// first occurrence. An unreadable README yields no keywords.
pub fn extract_keywords(readme: &Path, n: usize) -> Vec<String> {
    let bytes = match std::fs::read(readme) {
        Ok(b) => b,
        Err(e) => {
            error!("Error reading file {}: {}", readme.display(), e);
            return Vec::new();
        }
    };
    let content = String::from_utf8_lossy(&bytes);

    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (index, word) in content_words(&content).into_iter().enumerate() {
        counts.entry(word).or_insert((0, index)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(n).map(|(word, _)| word).collect()
}

/// Write `config` as YAML followed by a commented model catalogue.
pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    let mut yaml = serde_yaml::to_string(config)?;
    yaml.push_str("\n# Available models:\n");
    for model in DEFAULT_MODELS {
        yaml.push_str(&format!("# - {}\n", model));
    }
    yaml.push_str("#\n");
    yaml.push_str("# To find more models, visit https://huggingface.co/models\n");
    yaml.push_str("# https://huggingface.co/models?pipeline_tag=question-answering\n");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config: {}", path.display()))?;
    info!("Configuration written to {}", path.display());
    Ok(())
}
