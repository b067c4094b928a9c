//! # repo-qna
//!
//! Generate question/answer seed examples from a Git repository's
//! documentation.
//!
//! A run clones a repository at a pinned commit, collects text files by glob
//! pattern, keeps the paragraphs that mention configured keywords, asks a
//! question-answering model each question template against that text, and
//! writes the accepted pairs to YAML.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌──────────┐
//! │  Fetch   │──▶│ Collect  │──▶│  Extract + │──▶│  Answer  │──▶│  Report  │
//! │ git@sha  │   │  globs   │   │  Combine   │   │ QA model │   │ YAML/CSV │
//! └──────────┘   └──────────┘   └────────────┘   └──────────┘   └────┬─────┘
//!                                                                    ▼
//!                                                             ┌────────────┐
//!                                                             │ Pushgateway│
//!                                                             └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qna init-config https://github.com/org/project ./project-clone
//! qna generate --config config.yaml --dry-run
//! qna generate --config config.yaml --save-scores
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | YAML/TOML configuration, overrides and validation |
//! | [`models`] | Data types: `FileContent`, `SeedExample`, `RunMetrics` |
//! | [`fetch`] | Clone a repository and check out a commit |
//! | [`collect`] | Glob expansion, binary detection, file reading |
//! | [`sections`] | Paragraph splitting, keyword filtering, section packing |
//! | [`qa`] | `QuestionAnswerer` trait, backends, answer selection |
//! | [`report`] | YAML and CSV writers, results listing |
//! | [`push`] | Prometheus push-gateway client |
//! | [`pipeline`] | Stage orchestration and the multi-model loop |
//! | [`config_gen`] | Starter configuration generator |
//! | [`text`] | Tokenization, stopwords, sentence splitting |

pub mod collect;
pub mod config;
pub mod config_gen;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod push;
pub mod qa;
pub mod report;
pub mod sections;
pub mod text;

#[cfg(test)]
mod test_support;
