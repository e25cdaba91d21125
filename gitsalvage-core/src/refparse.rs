//! Regex-driven extraction of ref paths, pack ids, and object ids out of fetched artifact
//! bytes. Used by the ref-discovery worker (§4.4) and by phase 6's object-set assembly.

use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;

/// Matches `refs/<component>(/<component>)+`, e.g. `refs/heads/feature/thing`.
static REF_PATTERN: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"refs(?:/[a-zA-Z0-9\-._*]+)+").expect("valid regex"));

/// Matches `branch "name"` / `branch 'name'` lines found in `FETCH_HEAD`.
static BRANCH_PATTERN: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r#"branch ["'](.+)["']"#).expect("valid regex"));

/// Matches a 40-hex sha1 pack id inside `.git/objects/info/packs` (`pack-<sha1>.pack`
/// listing lines).
static PACK_ID_PATTERN: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"([0-9a-f]{40})").expect("valid regex"));

/// Matches any standalone 40-hex object id.
static OBJECT_ID_PATTERN: Lazy<BytesRegex> = Lazy::new(|| BytesRegex::new(r"[0-9a-f]{40}").expect("valid regex"));

/// Matches one `<old> <new> ...` reflog line; we only need the two hashes.
static REFLOG_LINE_PATTERN: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?m)^([0-9a-f]{40}) ([0-9a-f]{40})").expect("valid regex"));

/// All `refs/...` paths found anywhere in `body`, as UTF-8 strings (ref paths are always
/// ASCII in practice; a non-UTF8 match is skipped rather than panicking).
pub fn find_ref_paths(body: &[u8]) -> Vec<String> {
    REF_PATTERN
        .find_iter(body)
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok().map(str::to_owned))
        .collect()
}

/// Branch names referenced by `branch "name"` lines (only meaningful for `FETCH_HEAD`).
pub fn find_fetch_head_branches(body: &[u8]) -> Vec<String> {
    BRANCH_PATTERN
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok().map(str::to_owned))
        .collect()
}

/// 40-hex pack ids referenced inside `.git/objects/info/packs`.
pub fn find_pack_ids(body: &[u8]) -> Vec<String> {
    PACK_ID_PATTERN
        .find_iter(body)
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok().map(str::to_owned))
        .collect()
}

/// All 40-hex object ids found anywhere in `body` (used for the generic-file scan in phase
/// 6: `packed-refs`, `info/refs`, `FETCH_HEAD`, loose `refs/`/`logs/` files, …).
pub fn find_object_ids(body: &[u8]) -> Vec<String> {
    OBJECT_ID_PATTERN
        .find_iter(body)
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok().map(str::to_owned))
        .collect()
}

/// The object id from the second capture group of the *last* reflog entry, used to
/// synthesize a ref file when only its reflog survived (distilled spec, phase 6 / scenario
/// 5). Returns `None` if `body` has no parseable reflog lines.
pub fn last_reflog_target(body: &[u8]) -> Option<String> {
    REFLOG_LINE_PATTERN
        .captures_iter(body)
        .last()
        .and_then(|c| c.get(2))
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ref_paths() {
        let body = b"some garbage refs/heads/main more garbage refs/remotes/origin/dev\n";
        let refs = find_ref_paths(body);
        assert_eq!(refs, vec!["refs/heads/main", "refs/remotes/origin/dev"]);
    }

    #[test]
    fn extracts_fetch_head_branch_names() {
        let body = b"deadbeefdeadbeefdeadbeefdeadbeefdeadbeef\t\tbranch 'main' of https://example.com/r\n";
        assert_eq!(find_fetch_head_branches(body), vec!["main"]);
    }

    #[test]
    fn extracts_last_reflog_target() {
        let body = b"0000000000000000000000000000000000000000 1111111111111111111111111111111111111111 a <a@b> 0 +0000\tcommit (initial): x\n1111111111111111111111111111111111111111 2222222222222222222222222222222222222222 a <a@b> 1 +0000\tcommit: y\n";
        assert_eq!(
            last_reflog_target(body).as_deref(),
            Some("2222222222222222222222222222222222222222")
        );
    }

    #[test]
    fn no_reflog_lines_returns_none() {
        assert_eq!(last_reflog_target(b"not a reflog"), None);
    }
}
