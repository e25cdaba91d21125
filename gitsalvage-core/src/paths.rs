//! Shared filesystem and URL-join helpers, plus the hard-coded seed lists used by phases 3
//! and 4 of the orchestrator.

use std::path::{Path, PathBuf};

/// Join a base URL/path and a relative path, trimming exactly one trailing slash from the
/// base and one leading slash from `path`. Mirrors the reference tool's `utils.URL`.
pub fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Join a base directory and a relative path into a `PathBuf`.
pub fn join_path(base: impl AsRef<Path>, path: &str) -> PathBuf {
    base.as_ref().join(path.trim_start_matches('/'))
}

/// Heuristic HTML sniff used for the acceptability check: does the body look like a
/// directory-listing or error page rather than raw git/object bytes?
pub fn looks_like_html(body: &[u8]) -> bool {
    let trimmed = {
        let mut i = 0;
        while i < body.len() && body[i].is_ascii_whitespace() {
            i += 1;
        }
        &body[i..]
    };
    trimmed.first() == Some(&b'<')
}

/// Is the body empty or made up entirely of whitespace?
pub fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

/// Create all parent directories of `target`, if any.
pub fn create_parent_dirs(target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Does `dir` exist and contain no entries?
pub fn dir_is_empty(dir: &Path) -> std::io::Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}

/// The fixed set of well-known `.git/` paths seeded in phase 3 ("common files").
pub const COMMON_FILES: &[&str] = &[
    ".git/HEAD",
    ".git/ORIG_HEAD",
    ".git/FETCH_HEAD",
    ".git/config",
    ".git/config.worktree",
    ".git/description",
    ".git/index",
    ".git/packed-refs",
    ".git/info/exclude",
    ".git/info/refs",
    ".git/info/grafts",
    ".git/info/alternates",
    ".git/info/http-alternates",
    ".git/info/sparse-checkout",
    ".git/objects/info/packs",
    ".git/objects/info/alternates",
    ".git/objects/info/http-alternates",
    ".git/objects/info/commit-graph",
    ".git/objects/info/commit-graphs/commit-graph-chain",
    ".git/objects/loose-object-idx",
    ".git/hooks/pre-commit.sample",
    ".git/hooks/pre-push.sample",
    ".git/hooks/post-checkout.sample",
    ".git/logs/HEAD",
    ".git/COMMIT_EDITMSG",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
];

/// The fixed set of well-known refs seeded in phase 4 ("common refs"); both the ref
/// itself and its reflog counterpart are enqueued for each.
pub const COMMON_REFS: &[&str] = &[
    ".git/refs/heads/master",
    ".git/refs/heads/main",
    ".git/refs/heads/dev",
    ".git/refs/heads/develop",
    ".git/refs/heads/staging",
    ".git/refs/heads/production",
    ".git/refs/heads/trunk",
    ".git/refs/remotes/origin/HEAD",
    ".git/refs/remotes/origin/master",
    ".git/refs/remotes/origin/main",
    ".git/refs/stash",
    ".git/logs/refs/heads/master",
    ".git/logs/refs/heads/main",
    ".git/logs/refs/heads/dev",
    ".git/logs/refs/heads/develop",
    ".git/logs/refs/remotes/origin/HEAD",
    ".git/logs/refs/remotes/origin/master",
    ".git/logs/refs/remotes/origin/main",
    ".git/logs/refs/stash",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_trims_exactly_one_slash_each_side() {
        assert_eq!(join("http://x/", "/.git/HEAD"), "http://x/.git/HEAD");
        assert_eq!(join("http://x", ".git/HEAD"), "http://x/.git/HEAD");
    }

    #[test]
    fn html_sniff_ignores_leading_whitespace() {
        assert!(looks_like_html(b"   \n<html>"));
        assert!(!looks_like_html(b"blob 5\0hello"));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(b""));
        assert!(is_blank(b"   \n\t"));
        assert!(!is_blank(b"x"));
    }
}
