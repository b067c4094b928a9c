//! # qna CLI
//!
//! ## Usage
//!
//! ```bash
//! qna --config ./config.yaml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qna generate` | Run the pipeline and write seed examples |
//! | `qna validate` | Load and validate the configuration |
//! | `qna init-config <repo> <dir>` | Clone a repository and write a starter config |
//!
//! Every `generate` override can also be given through its `QNA_*`
//! environment variable. Flags win over the environment, which wins over
//! the config file.

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repo_qna::config::{self, ConfigOverrides};
use repo_qna::config_gen::{self, GenerateOptions, DEFAULT_COMMIT_ID, DEFAULT_PROJECT_NAME};
use repo_qna::pipeline::{self, RunOptions};

/// Generate question/answer seed examples from a Git repository.
#[derive(Parser)]
#[command(name = "qna", version, about)]
struct Cli {
    /// Path to the configuration file (YAML, or TOML with a `.toml` extension).
    #[arg(long, global = true, env = "QNA_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone the repository, extract sections, answer questions and write YAML.
    ///
    /// Fails when fewer than `min_answers` answers are produced.
    Generate(GenerateArgs),

    /// Validate the configuration and print a summary.
    Validate,

    /// Clone a repository and write a starter configuration.
    ///
    /// Patterns come from the file extensions in the tree; keywords are the
    /// most frequent README words.
    InitConfig {
        /// Repository URL to clone.
        repo_url: String,

        /// Directory to clone into (reused if it already exists).
        clone_dir: PathBuf,

        #[arg(long, default_value = DEFAULT_PROJECT_NAME)]
        project_name: String,

        #[arg(long, default_value = DEFAULT_COMMIT_ID)]
        commit_id: String,

        /// Where to write the configuration.
        #[arg(long, default_value = "config.yaml")]
        output: PathBuf,

        /// Number of README keywords to keep.
        #[arg(long, default_value_t = 10)]
        num_keywords: usize,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, env = "QNA_PROJECT_NAME")]
    project_name: Option<String>,

    #[arg(long, env = "QNA_REPO_URL")]
    repo_url: Option<String>,

    #[arg(long, env = "QNA_COMMIT_ID")]
    commit_id: Option<String>,

    /// Comma-separated glob patterns, e.g. `README.md,docs/**/*.md`.
    #[arg(long, env = "QNA_PATTERNS", value_delimiter = ',')]
    patterns: Vec<String>,

    /// Output YAML path.
    #[arg(long, env = "QNA_YAML_PATH")]
    yaml_path: Option<PathBuf>,

    #[arg(long, env = "QNA_MAX_FILES")]
    max_files: Option<usize>,

    /// Per-file (and combined) line budget.
    #[arg(long, env = "QNA_MAX_LINES")]
    max_lines: Option<usize>,

    /// Comma-separated keywords.
    #[arg(long, env = "QNA_KEYWORDS", value_delimiter = ',')]
    keywords: Vec<String>,

    /// Minimum number of words in an accepted answer.
    #[arg(long, env = "QNA_MIN_SENTENCE_LENGTH")]
    min_sentence_length: Option<usize>,

    /// Minimum number of accepted answers for the run to succeed.
    #[arg(long, env = "QNA_MIN_ANSWERS")]
    min_answers: Option<usize>,

    /// Run a single model, ignoring `optimize`.
    #[arg(long, env = "QNA_MODEL")]
    model: Option<String>,

    /// Clone into this directory instead of a temporary one.
    #[arg(long, env = "QNA_CLONE_DIR")]
    clone_dir: Option<PathBuf>,

    /// Write per-question scores to CSV. The environment toggle accepts
    /// `1`/`true`/`yes`; `0`, `false`, `no`, `off` or empty leave it off.
    #[arg(
        long,
        env = "QNA_SAVE_SCORES",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    save_scores: bool,

    /// Push metrics to the Prometheus push-gateway.
    #[arg(
        long,
        env = "QNA_ENABLE_PROMETHEUS",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    enable_prometheus: bool,

    #[arg(long, env = "QNA_PUSHGATEWAY_URL")]
    pushgateway_url: Option<String>,

    #[arg(long, env = "QNA_PUSHGATEWAY_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "QNA_PUSHGATEWAY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Stop after section extraction and print counts.
    #[arg(long)]
    dry_run: bool,
}

impl GenerateArgs {
    fn overrides(&mut self) -> ConfigOverrides {
        ConfigOverrides {
            project_name: self.project_name.take(),
            repo_url: self.repo_url.take(),
            commit_id: self.commit_id.take(),
            patterns: non_empty(std::mem::take(&mut self.patterns)),
            yaml_path: self.yaml_path.take(),
            max_files: self.max_files,
            max_lines: self.max_lines,
            keywords: non_empty(std::mem::take(&mut self.keywords)),
            min_sentence_length: self.min_sentence_length,
            min_answers: self.min_answers,
            model: self.model.take(),
            pushgateway_url: self.pushgateway_url.take(),
            username: self.username.take(),
            password: self.password.take(),
        }
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    let values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then_some(values)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(mut args) => {
            let mut cfg = config::read_config(&cli.config)?;
            cfg.apply_overrides(args.overrides());
            cfg.validate()?;

            let opts = RunOptions {
                clone_dir: args.clone_dir,
                save_scores: args.save_scores,
                enable_prometheus: args.enable_prometheus,
                dry_run: args.dry_run,
            };
            let outcomes = pipeline::run(&cfg, &opts)?;
            for outcome in &outcomes {
                println!(
                    "wrote {} seed examples ({}) to {}",
                    outcome.seed_examples.len(),
                    outcome.metrics.model_name,
                    outcome.yaml_path.display()
                );
            }
        }
        Commands::Validate => {
            let cfg = config::load_config(&cli.config)?;
            println!("config {}", cli.config.display());
            println!("  project: {}", cfg.project_name);
            println!("  repo: {} @ {}", cfg.repo_url, cfg.commit_id);
            println!("  patterns: {}", cfg.patterns.len());
            println!("  keywords: {}", cfg.keywords.len());
            println!("  questions: {}", cfg.questions.len());
            println!("  models: {}", cfg.models().join(", "));
            println!("  output: {}", cfg.output_path(None).display());
            println!("ok");
        }
        Commands::InitConfig {
            repo_url,
            clone_dir,
            project_name,
            commit_id,
            output,
            num_keywords,
        } => {
            config_gen::run_init_config(&GenerateOptions {
                repo_url,
                clone_dir,
                project_name,
                commit_id,
                num_keywords,
                output,
            })?;
        }
    }

    Ok(())
}
