use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn qna_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("qna");
    path
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A local origin repository with a README and a docs tree.
fn setup_origin() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    git(root, &["init", "--quiet"]);

    fs::write(
        root.join("README.md"),
        "# Acme\n\n\
         This is a community toolkit for building documentation pipelines.\n\n\
         Our mission is to build an open community around documentation tooling.\n\n\
         Unrelated paragraph about the weather.\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(
        root.join("docs/features.md"),
        "Key features of the toolkit include glob collection and section packing.\n\n\
         The community maintains the toolkit and reviews every change.\n",
    )
    .unwrap();
    fs::write(root.join("docs/logo.png"), [0x89u8, b'P', b'N', b'G', 0x00, 0x01]).unwrap();

    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "init"]);
    let sha = git(root, &["rev-parse", "HEAD"]);
    (tmp, sha)
}

fn write_config(dir: &Path, origin: &Path, sha: &str, extra: &str) -> PathBuf {
    let config = format!(
        r#"project_name: Acme
repo_url: {}
commit_id: {}
patterns: ["README.md", "docs/*"]
keywords: ["mission", "community", "features"]
min_sentence_length: 5
min_answers: 2
yaml_path: {}/out/qna.yaml
model_name: lexical
questions:
  - "What is the mission of {{project_name}}?"
  - "What are the key features of {{project_name}}?"
  - "Who maintains {{project_name}}?"
qa:
  provider: lexical
{}"#,
        origin.display(),
        sha,
        dir.display(),
        extra
    );
    let path = dir.join("config.yaml");
    fs::write(&path, config).unwrap();
    path
}

fn run_qna(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_qna_with_env(config_path, args, &[])
}

fn run_qna_with_env(
    config_path: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> (String, String, bool) {
    let binary = qna_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("QNA_MODEL")
        .env_remove("QNA_MIN_ANSWERS")
        .env_remove("QNA_YAML_PATH")
        .env_remove("QNA_SAVE_SCORES")
        .env_remove("QNA_ENABLE_PROMETHEUS")
        .envs(env.iter().copied())
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qna binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_generate_writes_seed_examples() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");

    let (stdout, stderr, success) = run_qna(&config, &["generate"]);
    assert!(success, "generate failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Question: What is the mission of Acme?"));
    assert!(stdout.contains("Answer: Our mission is to build an open community"));
    assert!(stdout.contains("wrote 3 seed examples (lexical)"));

    let yaml = fs::read_to_string(work.path().join("out/qna.yaml")).unwrap();
    assert!(yaml.contains("question: What is the mission of Acme?"));
    assert!(!yaml.contains("weather"));

    let metrics = fs::read_to_string(work.path().join("out/metrics_lexical.csv")).unwrap();
    let mut lines = metrics.lines();
    assert!(lines.next().unwrap().starts_with("repo_url,commit_id,model_name,start_time"));
    assert!(lines.next().unwrap().contains(&sha));
    assert!(!work.path().join("out/scores_lexical.csv").exists());
}

#[test]
fn test_generate_save_scores() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");

    let (_, stderr, success) = run_qna(&config, &["generate", "--save-scores"]);
    assert!(success, "generate failed: {}", stderr);

    let scores = fs::read_to_string(work.path().join("out/scores_lexical.csv")).unwrap();
    assert!(scores.starts_with("question,answer,score\n"));
    assert_eq!(scores.lines().count(), 4);
}

#[test]
fn test_save_scores_from_environment() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");

    let (_, stderr, success) =
        run_qna_with_env(&config, &["generate"], &[("QNA_SAVE_SCORES", "1")]);
    assert!(success, "generate failed: {}", stderr);
    assert!(work.path().join("out/scores_lexical.csv").exists());

    let scores = work.path().join("out/scores_lexical.csv");
    fs::remove_file(&scores).unwrap();
    let (_, stderr, success) =
        run_qna_with_env(&config, &["generate"], &[("QNA_SAVE_SCORES", "0")]);
    assert!(success, "generate failed: {}", stderr);
    assert!(!scores.exists());
}

#[test]
fn test_generate_taxonomy_format() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(
        work.path(),
        origin.path(),
        &sha,
        "output:\n  format: taxonomy\n  created_by: tester\n",
    );

    let (_, stderr, success) = run_qna(&config, &["generate"]);
    assert!(success, "generate failed: {}", stderr);

    let yaml = fs::read_to_string(work.path().join("out/qna.yaml")).unwrap();
    assert!(yaml.contains("created_by: tester"));
    assert!(yaml.contains("domain: acme"));
    assert!(yaml.contains("seed_examples:"));
    assert!(yaml.contains(&sha));
}

#[test]
fn test_generate_fails_below_min_answers() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");

    let (_, stderr, success) = run_qna(
        &config,
        &["generate", "--keywords", "nonexistentword", "--min-answers", "1"],
    );
    assert!(!success);
    assert!(stderr.contains("minimum required number of answers (1)"));
    assert!(!work.path().join("out/qna.yaml").exists());
}

#[test]
fn test_generate_overrides_output_path() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");
    let target = work.path().join("custom/seed.yaml");

    let (_, stderr, success) = run_qna(
        &config,
        &["generate", "--yaml-path", target.to_str().unwrap()],
    );
    assert!(success, "generate failed: {}", stderr);
    assert!(target.exists());
    assert!(work.path().join("custom/metrics_lexical.csv").exists());
}

#[test]
fn test_optimize_writes_per_model_outputs() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(
        work.path(),
        origin.path(),
        &sha,
        "optimize: true\nmodel_list: [\"lex/one\", \"lex-two\"]\n",
    );

    let (stdout, stderr, success) = run_qna(&config, &["generate"]);
    assert!(success, "generate failed: stdout={}, stderr={}", stdout, stderr);
    assert!(work.path().join("out/qna-lex_one.yaml").exists());
    assert!(work.path().join("out/qna-lex-two.yaml").exists());
    assert!(work.path().join("out/metrics_lex_one.csv").exists());
    assert!(work.path().join("out/metrics_lex-two.csv").exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");

    let (stdout, stderr, success) = run_qna(&config, &["generate", "--dry-run"]);
    assert!(success, "dry-run failed: {}", stderr);
    assert!(stdout.contains("generate Acme (dry-run)"));
    assert!(stdout.contains("files read: 2"));
    assert!(stdout.contains("relevant sections: 4"));
    assert!(!work.path().join("out").exists());
}

#[test]
fn test_unknown_commit_fails() {
    let (origin, _) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(
        work.path(),
        origin.path(),
        "0000000000000000000000000000000000000000",
        "",
    );

    let (_, stderr, success) = run_qna(&config, &["generate"]);
    assert!(!success);
    assert!(stderr.contains("checkout"), "stderr: {}", stderr);
}

#[test]
fn test_validate() {
    let (origin, sha) = setup_origin();
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), origin.path(), &sha, "");

    let (stdout, stderr, success) = run_qna(&config, &["validate"]);
    assert!(success, "validate failed: {}", stderr);
    assert!(stdout.contains("project: Acme"));
    assert!(stdout.contains("questions: 3"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_validate_rejects_bad_config() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("config.yaml");
    fs::write(
        &path,
        "project_name: Acme\nrepo_url: x\ncommit_id: y\npatterns: ['*.md']\n\
         questions: ['What is {project_name}?']\nmin_answers: 3\n",
    )
    .unwrap();

    let (_, stderr, success) = run_qna(&path, &["validate"]);
    assert!(!success);
    assert!(stderr.contains("min_answers (3) exceeds the number of questions (1)"));
}

#[test]
fn test_init_config_generates_loadable_config() {
    let (origin, _) = setup_origin();
    let work = TempDir::new().unwrap();
    let clone_dir = work.path().join("clone");
    let output = work.path().join("generated.yaml");

    let (stdout, stderr, success) = run_qna(
        &output,
        &[
            "init-config",
            origin.path().to_str().unwrap(),
            clone_dir.to_str().unwrap(),
            "--project-name",
            "Acme",
            "--output",
            output.to_str().unwrap(),
            "--num-keywords",
            "3",
        ],
    );
    assert!(success, "init-config failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("generated successfully with dynamic keywords"));
    assert!(clone_dir.join("README.md").exists());

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("project_name: Acme"));
    assert!(content.contains("**/*.md"));
    assert!(content.contains("README.md"));
    assert!(content.contains("# Available models:"));

    let (stdout, stderr, success) = run_qna(&output, &["validate"]);
    assert!(success, "generated config invalid: {}", stderr);
    assert!(stdout.contains("keywords: 3"));
}
