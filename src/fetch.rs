//! Repository fetcher.
//!
//! Clones a repository and checks out a pinned commit using the `git`
//! executable. The clone lives in a directory owned by the returned
//! [`RepoCheckout`]: either a fresh temporary directory that is removed when
//! the checkout is dropped, or an explicit directory supplied by the caller.
//! Any pre-existing clone at the destination is removed first.
//!
//! There is no retry; clone and checkout failures abort the run.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::info;

/// A checked-out working tree.
#[derive(Debug)]
pub struct RepoCheckout {
    path: PathBuf,
    head_sha: String,
    // Dropping the TempDir deletes the clone.
    _temp: Option<TempDir>,
}

impl RepoCheckout {
    /// Clone `url` into a new temporary directory and check out `commit`.
    pub fn fetch(url: &str, commit: &str) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(&format!("qna-{}-", short_hash(url)))
            .tempdir()
            .with_context(|| "Failed to create temporary clone directory")?;
        let dest = temp.path().join("repo");
        let head_sha = clone_at_commit(url, commit, &dest)?;
        Ok(Self {
            path: dest,
            head_sha,
            _temp: Some(temp),
        })
    }

    /// Clone `url` into `dest`, replacing anything already there, and check
    /// out `commit`. The directory is left in place afterwards.
    pub fn fetch_into(url: &str, commit: &str, dest: &Path) -> Result<Self> {
        remove_existing(dest)?;
        let head_sha = clone_at_commit(url, commit, dest)?;
        Ok(Self {
            path: dest.to_path_buf(),
            head_sha,
            _temp: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn head_sha(&self) -> &str {
        &self.head_sha
    }
}

/// Clone `url` into `dest` unless a clone is already there.
/// Returns `true` when a clone was made.
pub fn clone_if_missing(url: &str, dest: &Path) -> Result<bool> {
    if dest.exists() {
        info!("Using existing clone at {}", dest.display());
        return Ok(false);
    }
    git_clone(url, dest)?;
    Ok(true)
}

fn clone_at_commit(url: &str, commit: &str, dest: &Path) -> Result<String> {
    info!("Cloning repository {}", url);
    git_clone(url, dest)?;
    git_checkout(dest, commit)?;
    let sha = git_head_sha(dest)?;
    info!("Checked out {} at {}", url, sha);
    Ok(sha)
}

fn remove_existing(dest: &Path) -> Result<()> {
    if !dest.exists() {
        return Ok(());
    }
    if !dest.is_dir() {
        bail!(
            "Clone destination exists and is not a directory: {}",
            dest.display()
        );
    }
    info!("Removing existing clone at {}", dest.display());
    std::fs::remove_dir_all(dest)
        .with_context(|| format!("Failed to remove existing clone: {}", dest.display()))?;
    Ok(())
}

fn git_clone(url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create clone parent: {}", parent.display()))?;
    }

    let output = Command::new("git")
        .args(["clone", "--quiet"])
        .arg(url)
        .arg(dest)
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}

fn git_checkout(repo_dir: &Path, commit: &str) -> Result<()> {
    let output = Command::new("git")
        .args(["-c", "advice.detachedHead=false", "checkout", "--quiet", commit])
        .current_dir(repo_dir)
        .output()
        .with_context(|| "Failed to execute 'git checkout'")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git checkout {} failed: {}", commit, stderr.trim());
    }

    Ok(())
}

fn git_head_sha(repo_dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .with_context(|| "Failed to get HEAD SHA")?;

    if !output.status.success() {
        bail!("git rev-parse HEAD failed");
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Origin repo with two commits; returns (dir, first_sha).
    fn origin_repo() -> (TempDir, String) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        git(dir, &["init", "--quiet"]);
        std::fs::write(dir.join("README.md"), "first version\n").unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "--quiet", "-m", "first"]);
        let first = git(dir, &["rev-parse", "HEAD"]);
        std::fs::write(dir.join("README.md"), "second version\n").unwrap();
        git(dir, &["commit", "--quiet", "-am", "second"]);
        (tmp, first)
    }

    #[test]
    fn test_fetch_checks_out_pinned_commit() {
        let (origin, first) = origin_repo();
        let url = origin.path().to_string_lossy().to_string();

        let checkout = RepoCheckout::fetch(&url, &first).unwrap();
        assert_eq!(checkout.head_sha(), first);
        let readme = std::fs::read_to_string(checkout.path().join("README.md")).unwrap();
        assert_eq!(readme, "first version\n");
    }

    #[test]
    fn test_temp_clone_removed_on_drop() {
        let (origin, first) = origin_repo();
        let url = origin.path().to_string_lossy().to_string();

        let checkout = RepoCheckout::fetch(&url, &first).unwrap();
        let path = checkout.path().to_path_buf();
        assert!(path.exists());
        drop(checkout);
        assert!(!path.exists());
    }

    #[test]
    fn test_fetch_into_replaces_existing_clone() {
        let (origin, first) = origin_repo();
        let url = origin.path().to_string_lossy().to_string();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("clone");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale.txt"), "left over").unwrap();

        let checkout = RepoCheckout::fetch_into(&url, &first, &dest).unwrap();
        assert!(!dest.join("stale.txt").exists());
        assert!(checkout.path().join("README.md").exists());
        drop(checkout);
        // Caller-owned directories are kept.
        assert!(dest.exists());
    }

    #[test]
    fn test_unknown_commit_fails() {
        let (origin, _) = origin_repo();
        let url = origin.path().to_string_lossy().to_string();
        let err = RepoCheckout::fetch(&url, "0000000000000000000000000000000000000000").unwrap_err();
        assert!(err.to_string().contains("git checkout"));
    }

    #[test]
    fn test_clone_failure_propagates() {
        let work = TempDir::new().unwrap();
        let missing = work.path().join("no-such-repo");
        let err = RepoCheckout::fetch(&missing.to_string_lossy(), "HEAD").unwrap_err();
        assert!(err.to_string().contains("git clone failed"));
    }

    #[test]
    fn test_short_hash_is_stable() {
        assert_eq!(short_hash("a"), short_hash("a"));
        assert_eq!(short_hash("a").len(), 12);
        assert_ne!(short_hash("a"), short_hash("b"));
    }
}
