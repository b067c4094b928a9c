//! Generation pipeline orchestration.
//!
//! Runs the stages in order: fetch → collect → extract → combine → answer →
//! report. Each stage completes before the next starts. In optimize mode the
//! whole pipeline repeats once per configured model and a failing model does
//! not stop the others.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::collect::collect_files;
use crate::config::Config;
use crate::fetch::RepoCheckout;
use crate::models::{RunMetrics, ScoreRecord, SeedExample};
use crate::push::{self, PushTarget};
use crate::qa::{create_answerer, select_answers, QuestionAnswerer};
use crate::report;
use crate::sections::{combine_sections, extract_relevant_sections, MAX_SECTION_CHARS};

/// Per-invocation switches that are not part of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Clone here instead of a temporary directory.
    pub clone_dir: Option<PathBuf>,
    pub save_scores: bool,
    /// Push metrics when a push-gateway URL is configured.
    pub enable_prometheus: bool,
    /// Stop after section extraction and print counts.
    pub dry_run: bool,
}

/// What one model run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub seed_examples: Vec<SeedExample>,
    pub scores: Vec<ScoreRecord>,
    pub metrics: RunMetrics,
    pub yaml_path: PathBuf,
}

/// Entry point for `qna generate`.
pub fn run(config: &Config, opts: &RunOptions) -> Result<Vec<RunOutcome>> {
    if opts.dry_run {
        run_dry(config, opts)?;
        return Ok(Vec::new());
    }

    if !config.optimize {
        let model = config.primary_model();
        let answerer = create_answerer(&config.qa, &model)?;
        let outcome = run_with_answerer(config, answerer.as_ref(), opts, false)?;
        return Ok(vec![outcome]);
    }

    let models = config.models();
    let mut outcomes = Vec::new();
    for model in &models {
        info!("Running optimization with model: {}", model);
        let result = create_answerer(&config.qa, model)
            .and_then(|answerer| run_with_answerer(config, answerer.as_ref(), opts, true));
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("Error with model {}: {:#}", model, e),
        }
    }

    if outcomes.is_empty() {
        bail!("All {} models failed", models.len());
    }
    info!(
        "Optimization finished: {} of {} models succeeded",
        outcomes.len(),
        models.len()
    );
    Ok(outcomes)
}

/// Run the full pipeline for one model. `per_model_paths` suffixes output
/// file names with the model so several runs can share a directory.
pub fn run_with_answerer(
    config: &Config,
    answerer: &dyn QuestionAnswerer,
    opts: &RunOptions,
    per_model_paths: bool,
) -> Result<RunOutcome> {
    let model = answerer.model_name().to_string();
    info!("Starting YAML generation process with model: {}", model);

    let mut metrics = RunMetrics::start(&config.repo_url, &config.commit_id, &model);
    let sections = prepare_sections(config, opts, &mut metrics)?;

    let started = Instant::now();
    let selection = select_answers(
        answerer,
        &sections,
        &config.project_name,
        &config.questions,
        config.min_sentence_length,
        config.qa.context_mode,
    );
    metrics.qa_generation_time = started.elapsed().as_secs_f64();
    metrics.qa_count = selection.seed_examples.len() as u64;

    if selection.seed_examples.len() < config.min_answers {
        error!(
            "Failed to generate the minimum required number of answers ({}).",
            config.min_answers
        );
        bail!(
            "Failed to generate the minimum required number of answers ({}); got {}",
            config.min_answers,
            selection.seed_examples.len()
        );
    }

    report::print_results(&selection.seed_examples, config.min_sentence_length, &model)?;

    if opts.save_scores {
        let path = config.scores_path(&model, per_model_paths);
        report::write_scores_csv(&path, &selection.scores)?;
    }

    let model_suffix = per_model_paths.then_some(model.as_str());
    let yaml_path = config.output_path(model_suffix);
    report::write_seed_yaml(&yaml_path, &selection.seed_examples, config)?;

    metrics.finish();
    report::write_metrics_csv(&config.metrics_path(&model, per_model_paths), &metrics)?;

    if let Some(target) = push_target(config, opts) {
        push::push_run_metrics(&target, &metrics);
        push::push_qa_metadata(&target, &model, &selection.seed_examples);
    }

    Ok(RunOutcome {
        seed_examples: selection.seed_examples,
        scores: selection.scores,
        metrics,
        yaml_path,
    })
}

/// Fetch, collect, extract and combine. The checkout is released on return.
fn prepare_sections(
    config: &Config,
    opts: &RunOptions,
    metrics: &mut RunMetrics,
) -> Result<Vec<String>> {
    let started = Instant::now();
    let checkout = match &opts.clone_dir {
        Some(dir) => RepoCheckout::fetch_into(&config.repo_url, &config.commit_id, dir)?,
        None => RepoCheckout::fetch(&config.repo_url, &config.commit_id)?,
    };
    metrics.clone_time = started.elapsed().as_secs_f64();

    let files = collect_files(
        checkout.path(),
        &config.patterns,
        config.max_files,
        config.max_lines,
    )?;
    metrics.file_count = files.len() as u64;

    let started = Instant::now();
    let combined_content = files.combined_text(config.max_lines);
    metrics.file_read_time = started.elapsed().as_secs_f64();

    let started = Instant::now();
    let relevant = extract_relevant_sections(&combined_content, &config.keywords);
    metrics.section_extraction_time = started.elapsed().as_secs_f64();
    metrics.relevant_section_count = relevant.len() as u64;

    Ok(combine_sections(&relevant, MAX_SECTION_CHARS))
}

fn run_dry(config: &Config, opts: &RunOptions) -> Result<()> {
    let mut metrics = RunMetrics::start(&config.repo_url, &config.commit_id, "none");
    let sections = prepare_sections(config, opts, &mut metrics)?;

    println!("generate {} (dry-run)", config.project_name);
    println!("  files read: {}", metrics.file_count);
    println!("  relevant sections: {}", metrics.relevant_section_count);
    println!("  combined sections: {}", sections.len());
    println!("  questions: {}", config.questions.len());
    println!("  models: {}", config.models().join(", "));
    Ok(())
}

fn push_target(config: &Config, opts: &RunOptions) -> Option<PushTarget> {
    if !opts.enable_prometheus {
        return None;
    }
    let url = config.pushgateway_url.clone()?;
    Some(PushTarget {
        url,
        job: config.project_name.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        timeout: Duration::from_secs(config.qa.timeout_secs),
    })
}
