//! Prometheus push-gateway reporting.
//!
//! Metrics are rendered in the Prometheus text exposition format and sent
//! with `POST {url}/metrics/job/{job}/instance/{instance}`. Every sample
//! carries an `instance` label. Failures are logged and never abort a run.

use std::fmt::Write as _;
use std::time::Duration;
use tracing::{error, info};

use crate::models::{RunMetrics, SeedExample};
use crate::text::word_count;

/// Where and how to push.
#[derive(Debug, Clone)]
pub struct PushTarget {
    pub url: String,
    pub job: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl PushTarget {
    /// Full grouping-key URL for `instance` (`/` in the instance becomes `-`).
    pub fn endpoint(&self, instance: &str) -> String {
        format!(
            "{}/metrics/job/{}/instance/{}",
            self.url.trim_end_matches('/'),
            self.job,
            instance.replace('/', "-")
        )
    }
}

/// Push the numeric run metrics as gauges. Returns whether the push succeeded.
pub fn push_run_metrics(target: &PushTarget, metrics: &RunMetrics) -> bool {
    let instance = &metrics.model_name;
    let mut body = String::new();
    for (name, value) in metrics.numeric_samples() {
        let help = format!("Description of {}", name);
        write_gauge(&mut body, name, &help, instance, value, &[]);
    }
    push(target, instance, body, "Metrics")
}

/// Push counts and answer lengths for the generated pairs, plus an info
/// metric listing every pair.
pub fn push_qa_metadata(target: &PushTarget, instance: &str, examples: &[SeedExample]) -> bool {
    push(target, instance, encode_qa_metadata(instance, examples), "Q&A metadata")
}

fn encode_qa_metadata(instance: &str, examples: &[SeedExample]) -> String {
    let lengths: Vec<usize> = examples.iter().map(|e| word_count(&e.answer)).collect();

    let mut gauges = vec![
        (
            "question_count",
            "Total number of questions",
            examples.len() as f64,
        ),
        ("answer_count", "Total number of answers", lengths.len() as f64),
    ];
    if let (Some(max), Some(min)) = (lengths.iter().max(), lengths.iter().min()) {
        gauges.push((
            "longest_answer_length",
            "Length of the longest answer",
            *max as f64,
        ));
        gauges.push((
            "shortest_answer_length",
            "Length of the shortest answer",
            *min as f64,
        ));
    }

    let mut body = String::new();
    for (name, help, value) in gauges {
        write_gauge(&mut body, name, help, instance, value, &[]);
    }

    let pairs: Vec<(String, String)> = examples
        .iter()
        .enumerate()
        .map(|(i, e)| {
            (
                format!("qa_pair_{}", i),
                format!("Q: {} A: {}", e.question, e.answer),
            )
        })
        .collect();
    write_gauge(
        &mut body,
        "qa_pairs_info",
        "Question and Answer pairs",
        instance,
        1.0,
        &pairs,
    );

    body
}

fn write_gauge(
    out: &mut String,
    name: &str,
    help: &str,
    instance: &str,
    value: f64,
    extra_labels: &[(String, String)],
) {
    let name = sanitize_metric_name(name);
    let help = help.replace('\\', "\\\\").replace('\n', "\\n");
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} gauge", name);

    let mut labels = format!("instance=\"{}\"", escape_label_value(instance));
    for (key, val) in extra_labels {
        let key = sanitize_metric_name(key);
        let _ = write!(labels, ",{}=\"{}\"", key, escape_label_value(val));
    }
    let _ = writeln!(out, "{}{{{}}} {}", name, labels, format_value(value));
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Replace characters outside `[a-zA-Z0-9_:]` with `_`; prefix a leading digit.
fn sanitize_metric_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn push(target: &PushTarget, instance: &str, body: String, what: &str) -> bool {
    let url = target.endpoint(instance);

    let client = match reqwest::blocking::Client::builder()
        .timeout(target.timeout)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build push-gateway client: {}", e);
            return false;
        }
    };

    let mut request = client
        .post(&url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body);
    if let (Some(user), Some(pass)) = (&target.username, &target.password) {
        request = request.basic_auth(user, Some(pass));
    }

    match request.send() {
        Ok(response) if response.status().is_success() => {
            info!("{} successfully pushed to Pushgateway. URL: {}", what, url);
            true
        }
        Ok(response) => {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            error!(
                "Failed to push {} to Pushgateway. URL: {}, Status Code: {}, Response: {}",
                what, url, status, text
            );
            false
        }
        Err(e) => {
            error!("Failed to push {} to Pushgateway. URL: {}, Error: {}", what, url, e);
            false
        }
    }
}
