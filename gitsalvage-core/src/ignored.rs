//! Phase 12: best-effort fetch of everything `.gitignore` lists, on the theory that ignored
//! files (build artifacts, local env files, ...) are often still present on the deployed
//! server even though they were never committed.

use std::sync::Arc;

use crate::jobtracker::JobTracker;
use crate::ratelimit::Gate;
use crate::workers::{download, Context};

/// Strip a trailing `# comment` from a `.gitignore` line.
///
/// This is deliberately a no-op: the original tool splits on `#` with a limit of 1, which
/// always yields the line unchanged. The bug is preserved rather than fixed, so a line like
/// `build/ # build output` is treated as a literal (and unmatchable) path rather than having
/// its comment stripped.
fn strip_comment(line: &str) -> &str {
    line.splitn(1, '#').next().unwrap_or(line)
}

fn is_ignorable(line: &str) -> bool {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return false;
    }
    if line.starts_with('#') {
        return false;
    }
    if line.starts_with('!') {
        return false;
    }
    if line.contains('*') || line.contains('?') || line.contains('[') {
        return false;
    }
    if line.ends_with('/') {
        return false;
    }
    if line.ends_with(".php") {
        return false;
    }
    true
}

pub fn run(
    base_dir: &std::path::Path,
    base_url: &str,
    client: reqwest::blocking::Client,
    gate: Arc<Gate>,
    max_parallel: usize,
) {
    let gitignore_path = base_dir.join(".gitignore");
    let Ok(body) = std::fs::read(&gitignore_path) else {
        tracing::debug!("no .gitignore present, skipping ignored-files pass");
        return;
    };

    let jobs: Vec<String> = String::from_utf8_lossy(&body)
        .lines()
        .filter(|line| is_ignorable(line))
        .map(|line| strip_comment(line).trim().trim_start_matches('/').to_owned())
        .collect();

    if jobs.is_empty() {
        tracing::info!("no ignored files to fetch");
        return;
    }
    tracing::info!(count = jobs.len(), "fetching ignored files");

    let ctx = Context::permissive(client, gate, base_url.to_owned(), base_dir.to_owned());
    let tracker = JobTracker::new(max_parallel);
    tracker.add_jobs(jobs);
    tracker.start_and_wait(ctx, false, move |handle, job, ctx| {
        download::run(handle, job, ctx);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_wildcards_negations_directories_php_and_comments() {
        assert!(!is_ignorable("*.log"));
        assert!(!is_ignorable("!keep.txt"));
        assert!(!is_ignorable("build/"));
        assert!(!is_ignorable("admin/secret.php"));
        assert!(!is_ignorable("# a comment"));
        assert!(!is_ignorable(""));
        assert!(is_ignorable(".env"));
    }

    #[test]
    fn trailing_comment_is_not_stripped_by_design() {
        // The split-limit-1 quirk: this line is kept whole, comment and all, rather than
        // being reduced to `.env`. It's therefore treated as one (unfetchable) literal path.
        assert_eq!(strip_comment(".env # local secrets"), ".env # local secrets");
    }
}
