//! Phase 11: parse `.gitattributes` for `filter=lfs` declarations, read the LFS stub files
//! they cover, and download each referenced object at its canonical LFS path.

use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use std::sync::Arc;

use crate::jobtracker::JobTracker;
use crate::ratelimit::Gate;
use crate::workers::{download, Context};

static OID_LINE: Lazy<BytesRegex> = Lazy::new(|| BytesRegex::new(r"(?m)^oid sha256:([0-9a-f]{64})$").expect("valid regex"));

/// One line of `.gitattributes`, split into the pattern and whether it declares
/// `filter=lfs`.
#[derive(Debug, PartialEq, Eq)]
enum Pattern {
    /// No glob metacharacter at all: a bare filename.
    Literal(String),
    /// Contains `*` but no `/`: matches at any depth, single path component.
    SimpleGlob(String),
    /// Contains `/`: anchored to a specific subtree. Collected, never fetched — this
    /// mirrors the known limitation that path globs are accepted but not acted on.
    PathGlob(String),
}

fn classify(pattern: &str) -> Pattern {
    if pattern.contains('/') {
        Pattern::PathGlob(pattern.to_owned())
    } else if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
        Pattern::SimpleGlob(pattern.to_owned())
    } else {
        Pattern::Literal(pattern.to_owned())
    }
}

/// Parse `.gitattributes` content into the three pattern groups, keeping only lines that
/// declare `filter=lfs`.
fn parse_attributes(body: &[u8]) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut literals = Vec::new();
    let mut simple_globs = Vec::new();
    let mut path_globs = Vec::new();

    for line in String::from_utf8_lossy(body).lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(pattern) = parts.next() else { continue };
        if !parts.any(|attr| attr == "filter=lfs") {
            continue;
        }
        match classify(pattern) {
            Pattern::Literal(p) => literals.push(p),
            Pattern::SimpleGlob(p) => simple_globs.push(p),
            Pattern::PathGlob(p) => path_globs.push(p),
        }
    }
    (literals, simple_globs, path_globs)
}

/// Does `name` (a bare filename, no path) match a simple single-component glob like `*.bin`?
fn simple_glob_matches(glob: &str, name: &str) -> bool {
    let Some((prefix, suffix)) = glob.split_once('*') else {
        return glob == name;
    };
    name.len() >= prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix)
}

/// Extract every `oid sha256:<hex>` line from an LFS stub file, matching the original's
/// line-by-line scan: non-`oid` lines are skipped rather than aborting the read.
fn stub_hashes(body: &[u8]) -> Vec<String> {
    OID_LINE
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok().map(str::to_owned))
        .collect()
}

pub fn run(
    base_dir: &std::path::Path,
    base_url: &str,
    client: reqwest::blocking::Client,
    gate: Arc<Gate>,
    max_parallel: usize,
) {
    let attrs_path = base_dir.join(".gitattributes");
    let Ok(attrs) = std::fs::read(&attrs_path) else {
        tracing::debug!("no .gitattributes present, skipping lfs pass");
        return;
    };

    let (literals, simple_globs, path_globs) = parse_attributes(&attrs);
    if !path_globs.is_empty() {
        tracing::warn!(
            count = path_globs.len(),
            "path-anchored lfs filters were found but are not currently fetched"
        );
    }

    let mut candidate_files = Vec::new();
    for literal in &literals {
        candidate_files.push(base_dir.join(literal));
    }
    if !simple_globs.is_empty() {
        if let Ok(read_dir) = std::fs::read_dir(base_dir) {
            for entry in read_dir.flatten() {
                let Ok(file_type) = entry.file_type() else { continue };
                if !file_type.is_file() {
                    continue;
                }
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if simple_globs.iter().any(|g| simple_glob_matches(g, &name)) {
                    candidate_files.push(entry.path());
                }
            }
        }
    }

    let mut hashes = Vec::new();
    for path in candidate_files {
        match std::fs::read(&path) {
            Ok(body) => hashes.extend(stub_hashes(&body)),
            Err(err) => tracing::debug!(file = %path.display(), error = %err, "couldn't read candidate lfs stub"),
        }
    }

    if hashes.is_empty() {
        tracing::info!("no lfs objects discovered");
        return;
    }
    tracing::info!(count = hashes.len(), "fetching lfs objects");

    let jobs: Vec<String> = hashes
        .into_iter()
        .map(|h| format!(".git/lfs/objects/{}/{}/{}", &h[0..2], &h[2..4], h))
        .collect();

    let ctx = Context::strict(client, gate, base_url.to_owned(), base_dir.to_owned());
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
    fn classifies_patterns() {
        assert_eq!(classify("*.bin"), Pattern::SimpleGlob("*.bin".into()));
        assert_eq!(classify("assets/*.bin"), Pattern::PathGlob("assets/*.bin".into()));
        assert_eq!(classify("model.bin"), Pattern::Literal("model.bin".into()));
    }

    #[test]
    fn parses_filter_lfs_lines_only() {
        let body = b"*.bin filter=lfs diff=lfs merge=lfs -text\n*.txt text\nassets/*.psd filter=lfs\n";
        let (literals, globs, paths) = parse_attributes(body);
        assert!(literals.is_empty());
        assert_eq!(globs, vec!["*.bin"]);
        assert_eq!(paths, vec!["assets/*.psd"]);
    }

    #[test]
    fn extracts_stub_hashes_skipping_other_lines() {
        let body = b"version https://git-lfs.github.com/spec/v1\noid sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\nsize 1234\n";
        let hashes = stub_hashes(body);
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].len(), 64);
    }

    #[test]
    fn simple_glob_matching() {
        assert!(simple_glob_matches("*.bin", "model.bin"));
        assert!(!simple_glob_matches("*.bin", "model.txt"));
        assert!(simple_glob_matches("model.bin", "model.bin"));
    }
}
