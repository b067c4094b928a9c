//! Question answering: the model abstraction and answer selection.
//!
//! Defines the [`QuestionAnswerer`] trait and two backends:
//! - **[`HuggingFaceAnswerer`]**: calls an extractive question-answering
//!   inference endpoint over HTTP, with retry and backoff.
//! - **[`LexicalAnswerer`]**: offline, returns the context sentence that
//!   shares the most content words with the question.
//!
//! [`select_answers`] runs every question template through a backend and
//! keeps at most one answer per question.
//!
//! # Retry Strategy
//!
//! The HTTP backend retries transient failures with exponential backoff:
//! - HTTP 429, 503 (model loading) and other 5xx → retry
//! - other HTTP 4xx → fail immediately
//! - network errors → retry
//! - backoff: 1s, 2s, 4s, ... capped at 32s

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{ContextMode, QaConfig, PROJECT_PLACEHOLDER};
use crate::models::{ScoreRecord, SeedExample};
use crate::text::{content_words, split_sentences, word_count};

/// An answer extracted from a context, with the model's confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub score: f64,
}

/// A question-answering model.
pub trait QuestionAnswerer {
    /// Model identifier, used in logs, file names and metric labels.
    fn model_name(&self) -> &str;
    /// Extract an answer to `question` from `context`.
    fn answer(&self, question: &str, context: &str) -> Result<Answer>;
}

/// Build the backend named by `config.provider` for `model`.
pub fn create_answerer(config: &QaConfig, model: &str) -> Result<Box<dyn QuestionAnswerer>> {
    match config.provider.as_str() {
        "huggingface" => Ok(Box::new(HuggingFaceAnswerer::new(config, model)?)),
        "lexical" => Ok(Box::new(LexicalAnswerer::new(model))),
        other => bail!("Unknown qa provider: {}", other),
    }
}

// ============ Hugging Face inference ============

/// Extractive QA through a Hugging Face style inference endpoint.
///
/// Sends `POST {endpoint}/models/{model}` with
/// `{"inputs": {"question": ..., "context": ...}}`. The bearer token is read
/// from `HF_API_TOKEN` when set.
pub struct HuggingFaceAnswerer {
    model: String,
    url: String,
    token: Option<String>,
    max_retries: u32,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    One(InferenceAnswer),
    Many(Vec<InferenceAnswer>),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct InferenceAnswer {
    answer: String,
    score: f64,
}

impl HuggingFaceAnswerer {
    pub fn new(config: &QaConfig, model: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let token = std::env::var("HF_API_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            model: model.to_string(),
            url: format!("{}/models/{}", config.endpoint.trim_end_matches('/'), model),
            token,
            max_retries: config.max_retries,
            client,
        })
    }
}

impl QuestionAnswerer for HuggingFaceAnswerer {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let body = serde_json::json!({
            "inputs": { "question": question, "context": context },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!("Retrying inference in {:?} (attempt {})", delay, attempt);
                std::thread::sleep(delay);
            }

            let mut request = self.client.post(&self.url).json(&body);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send() {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: InferenceResponse = response
                            .json()
                            .with_context(|| "Malformed inference response")?;
                        return answer_from_response(parsed);
                    }

                    let body_text = response.text().unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!(
                            "Inference API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("Inference API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Inference failed after retries")))
    }
}

fn answer_from_response(response: InferenceResponse) -> Result<Answer> {
    let best = match response {
        InferenceResponse::One(a) => a,
        InferenceResponse::Many(list) => list
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| anyhow::anyhow!("Empty inference response"))?,
        InferenceResponse::Error { error } => bail!("Inference API error: {}", error),
    };
    Ok(Answer {
        text: best.answer,
        score: best.score,
    })
}

// ============ Lexical ============

/// Picks the context sentence with the largest share of the question's
/// content words. Returns an empty answer when nothing overlaps.
pub struct LexicalAnswerer {
    model: String,
}

impl LexicalAnswerer {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

impl QuestionAnswerer for LexicalAnswerer {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let sentences = split_sentences(context);
        if sentences.is_empty() {
            bail!("Empty context");
        }

        let mut terms = content_words(question);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Ok(Answer {
                text: String::new(),
                score: 0.0,
            });
        }

        let mut best = Answer {
            text: String::new(),
            score: 0.0,
        };
        for sentence in sentences {
            let words = content_words(sentence);
            let hits = terms.iter().filter(|t| words.contains(t)).count();
            let score = hits as f64 / terms.len() as f64;
            if score > best.score {
                best = Answer {
                    text: sentence.to_string(),
                    score,
                };
            }
        }
        Ok(best)
    }
}

// ============ Selection ============

/// Accepted answers, in question-template order.
#[derive(Debug, Default)]
pub struct Selection {
    pub seed_examples: Vec<SeedExample>,
    pub scores: Vec<ScoreRecord>,
}

pub fn render_question(template: &str, project_name: &str) -> String {
    template.replace(PROJECT_PLACEHOLDER, project_name)
}

/// Ask every question and keep, per question, the highest-scoring answer
/// with at least `min_words` words. Model errors are logged and the
/// question (or, with [`ContextMode::PerSection`], that section) is skipped.
pub fn select_answers(
    answerer: &dyn QuestionAnswerer,
    sections: &[String],
    project_name: &str,
    questions: &[String],
    min_words: usize,
    mode: ContextMode,
) -> Selection {
    let mut selection = Selection::default();

    if sections.is_empty() {
        warn!(
            "No relevant sections; skipping all {} questions",
            questions.len()
        );
        return selection;
    }

    let joined;
    let contexts: Vec<&str> = match mode {
        ContextMode::Joined => {
            joined = sections.join(" ");
            vec![joined.as_str()]
        }
        ContextMode::PerSection => sections.iter().map(String::as_str).collect(),
    };

    for template in questions {
        let question = render_question(template, project_name);
        let started = Instant::now();
        let mut best: Option<Answer> = None;

        for context in &contexts {
            let answer = match answerer.answer(&question, context) {
                Ok(a) => a,
                Err(e) => {
                    error!("Error processing question '{}': {:#}", question, e);
                    continue;
                }
            };
            let text = answer.text.trim();
            info!(
                "Processing question '{}' with answer: '{}' and score: {}",
                question, text, answer.score
            );

            let words = word_count(text);
            if words < min_words {
                warn!(
                    "Skipped answer for '{}' due to insufficient answer length. Answer: '{}', Length: {}",
                    question, text, words
                );
                continue;
            }
            if best.as_ref().map_or(true, |b| answer.score > b.score) {
                best = Some(Answer {
                    text: text.to_string(),
                    score: answer.score,
                });
            }
        }

        debug!(
            "Question '{}' took {:.2} seconds",
            question,
            started.elapsed().as_secs_f64()
        );

        if let Some(best) = best {
            selection.seed_examples.push(SeedExample {
                question: question.clone(),
                answer: best.text.clone(),
            });
            selection.scores.push(ScoreRecord {
                question,
                answer: best.text,
                score: best.score,
            });
        }
    }

    selection
}
