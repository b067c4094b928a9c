//! Run configuration.
//!
//! The configuration file is YAML by default (`config.yaml`, as written by
//! `qna init-config`); a `.toml` extension switches to the TOML parser.
//! Command-line flags and `QNA_*` environment variables are folded in via
//! [`Config::apply_overrides`] before [`Config::validate`] runs.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when neither `model_name` nor `model_list` is configured.
pub const DEFAULT_MODEL: &str = "deepset/roberta-base-squad2";

/// Placeholder substituted with the project name in every question template.
pub const PROJECT_PLACEHOLDER: &str = "{project_name}";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub project_name: String,
    pub repo_url: String,
    pub commit_id: String,
    pub patterns: Vec<String>,
    #[serde(default = "default_yaml_path")]
    pub yaml_path: PathBuf,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_min_sentence_length")]
    pub min_sentence_length: usize,
    #[serde(default = "default_min_answers")]
    pub min_answers: usize,
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_list: Vec<String>,
    #[serde(default)]
    pub optimize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushgateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_yaml_path() -> PathBuf {
    PathBuf::from("qna.yaml")
}
fn default_max_files() -> usize {
    100
}
fn default_max_lines() -> usize {
    2000
}
fn default_min_sentence_length() -> usize {
    5
}
fn default_min_answers() -> usize {
    5
}

/// Question-answering backend settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QaConfig {
    /// `huggingface` (HTTP inference endpoint) or `lexical` (offline).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub context_mode: ContextMode,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            context_mode: ContextMode::default(),
        }
    }
}

fn default_provider() -> String {
    "huggingface".to_string()
}
fn default_endpoint() -> String {
    "https://api-inference.huggingface.co".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

/// How combined sections are presented to the model.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// One call per question over all sections joined by a space.
    #[default]
    Joined,
    /// One call per section; the highest-scoring qualifying answer wins.
    PerSection,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_created_by")]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            created_by: default_created_by(),
            domain: None,
            task_description: None,
            scores_path: None,
            metrics_path: None,
        }
    }
}

fn default_created_by() -> String {
    "qna".to_string()
}

/// Shape of the seed-example YAML document.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A bare list of `{question, answer}` mappings.
    #[default]
    List,
    /// Seed examples wrapped with project and source-document metadata.
    Taxonomy,
}

/// Values supplied on the command line or through `QNA_*` variables.
/// `None` leaves the file value untouched.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub project_name: Option<String>,
    pub repo_url: Option<String>,
    pub commit_id: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub yaml_path: Option<PathBuf>,
    pub max_files: Option<usize>,
    pub max_lines: Option<usize>,
    pub keywords: Option<Vec<String>>,
    pub min_sentence_length: Option<usize>,
    pub min_answers: Option<usize>,
    pub model: Option<String>,
    pub pushgateway_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            project_name,
            repo_url,
            commit_id,
            patterns,
            yaml_path,
            max_files,
            max_lines,
            keywords,
            min_sentence_length,
            min_answers,
            model,
            pushgateway_url,
            username,
            password,
        } = overrides;

        if let Some(v) = project_name {
            self.project_name = v;
        }
        if let Some(v) = repo_url {
            self.repo_url = v;
        }
        if let Some(v) = commit_id {
            self.commit_id = v;
        }
        if let Some(v) = patterns {
            self.patterns = v;
        }
        if let Some(v) = yaml_path {
            self.yaml_path = v;
        }
        if let Some(v) = max_files {
            self.max_files = v;
        }
        if let Some(v) = max_lines {
            self.max_lines = v;
        }
        if let Some(v) = keywords {
            self.keywords = v;
        }
        if let Some(v) = min_sentence_length {
            self.min_sentence_length = v;
        }
        if let Some(v) = min_answers {
            self.min_answers = v;
        }
        if let Some(v) = model {
            // An explicit model pins a single-model run.
            self.model_name = Some(v);
            self.optimize = false;
        }
        if pushgateway_url.is_some() {
            self.pushgateway_url = pushgateway_url;
        }
        if username.is_some() {
            self.username = username;
        }
        if password.is_some() {
            self.password = password;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            bail!("project_name must not be empty");
        }
        if self.repo_url.trim().is_empty() {
            bail!("repo_url must not be empty");
        }
        if self.commit_id.trim().is_empty() {
            bail!("commit_id must not be empty");
        }
        if self.patterns.iter().all(|p| p.trim().is_empty()) {
            bail!("patterns must contain at least one glob pattern");
        }
        if self.max_files == 0 {
            bail!("max_files must be > 0");
        }
        if self.max_lines == 0 {
            bail!("max_lines must be > 0");
        }
        if self.questions.is_empty() {
            bail!("questions must contain at least one template");
        }
        if self.min_answers > self.questions.len() {
            bail!(
                "min_answers ({}) exceeds the number of questions ({}); the run could never succeed",
                self.min_answers,
                self.questions.len()
            );
        }
        if self.optimize && self.model_list.is_empty() {
            bail!("optimize requires a non-empty model_list");
        }

        match self.qa.provider.as_str() {
            "huggingface" | "lexical" => {}
            other => bail!(
                "Unknown qa provider: '{}'. Must be huggingface or lexical.",
                other
            ),
        }
        if self.qa.timeout_secs == 0 {
            bail!("qa.timeout_secs must be > 0");
        }

        Ok(())
    }

    /// The model for a single (non-optimize) run.
    pub fn primary_model(&self) -> String {
        self.model_name
            .clone()
            .or_else(|| self.model_list.first().cloned())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Models to run, in order. Optimize mode walks the whole list.
    pub fn models(&self) -> Vec<String> {
        if self.optimize {
            self.model_list.clone()
        } else {
            vec![self.primary_model()]
        }
    }

    /// Where the seed-example YAML goes. Relative paths are placed under
    /// `taxonomy_dir` when one is configured. `model` adds a per-model suffix.
    pub fn output_path(&self, model: Option<&str>) -> PathBuf {
        let base = match &self.taxonomy_dir {
            Some(dir) if self.yaml_path.is_relative() => expand_home(dir).join(&self.yaml_path),
            _ => self.yaml_path.clone(),
        };
        match model {
            Some(m) => with_model_suffix(&base, m),
            None => base,
        }
    }

    pub fn scores_path(&self, model: &str, suffix: bool) -> PathBuf {
        self.report_path(self.output.scores_path.as_deref(), "scores", model, suffix)
    }

    pub fn metrics_path(&self, model: &str, suffix: bool) -> PathBuf {
        self.report_path(self.output.metrics_path.as_deref(), "metrics", model, suffix)
    }

    fn report_path(&self, explicit: Option<&Path>, kind: &str, model: &str, suffix: bool) -> PathBuf {
        match explicit {
            Some(path) if suffix => with_model_suffix(path, model),
            Some(path) => path.to_path_buf(),
            None => {
                let dir = self
                    .output_path(None)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                dir.join(format!("{}_{}.csv", kind, sanitize_model_name(model)))
            }
        }
    }

    pub fn domain(&self) -> String {
        self.output
            .domain
            .clone()
            .unwrap_or_else(|| self.project_name.to_lowercase().replace(' ', "_"))
    }

    pub fn task_description(&self) -> String {
        self.output
            .task_description
            .clone()
            .unwrap_or_else(|| format!("Questions and answers about {}", self.project_name))
    }
}

/// Make a model identifier safe for use in a file name.
pub fn sanitize_model_name(model: &str) -> String {
    model.replace('/', "_")
}

/// `dir/name.ext` → `dir/name-<model>.ext`.
pub fn with_model_suffix(path: &Path, model: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!(
            "{}-{}.{}",
            stem,
            sanitize_model_name(model),
            ext.to_string_lossy()
        ),
        None => format!("{}-{}", stem, sanitize_model_name(model)),
    };
    path.with_file_name(name)
}

/// Expand a leading `~/` using `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// Parse a config file without validating it.
pub fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let config: Config = if is_toml {
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        serde_yaml::from_str(&content).with_context(|| "Failed to parse config file")?
    };

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}
