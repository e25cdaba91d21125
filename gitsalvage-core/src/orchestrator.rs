//! The phased pipeline (§4.7): thirteen phases run in fixed order, each either seeding a
//! job tracker and waiting for it to drain, or walking already-downloaded artifacts to grow
//! the object set. [`Engine`] owns everything scoped to one invocation — the two
//! de-duplication registries and the rate-limit gate included — so that list mode starts
//! each target with a clean slate instead of sharing state across entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::dedup::{ObjectRegistry, RefRegistry};
use crate::jobtracker::JobTracker;
use crate::objectset::ObjectSet;
use crate::objectstore::ObjectStore;
use crate::ratelimit::Gate;
use crate::workers::{createobject, download, findobjects, findref, recursive, Context};

mod error {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("couldn't parse {0} as a url")]
        InvalidUrl(String, #[source] url::ParseError),
        #[error("destination {path} already exists and is not empty (pass force or keep)")]
        DestinationExists { path: std::path::PathBuf },
        #[error("destination {path} exists and is not a directory")]
        DestinationIsFile { path: std::path::PathBuf },
        #[error(transparent)]
        Http(#[from] crate::http::Error),
        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}
pub use error::Error;

/// Process-wide constant parallelism budget, matching the original tool's default.
const DEFAULT_MAX_PARALLEL: usize = 24;

pub struct Engine {
    max_parallel: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARALLEL)
    }
}

impl Engine {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    /// Clone a single target. `dir` defaults to the target's host when absent.
    pub fn clone(&self, target: &str, dir: Option<&str>, force: bool, keep: bool) -> Result<(), Error> {
        let (base_url, default_dir) = normalize_url(target)?;
        let dir = dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default_dir));
        self.run(&base_url, &dir, force, keep)
    }

    /// Clone every non-blank line of `list_path`, one at a time, each into `<dir>/<host>`
    /// when `dir` is set (or the bare host otherwise). A line that fails to parse as a URL
    /// is logged and skipped; the overall run does not abort.
    pub fn clone_list(&self, list_path: &Path, dir: Option<&str>, force: bool, keep: bool) -> Result<(), Error> {
        let contents = std::fs::read_to_string(list_path)?;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (base_url, host) = match normalize_url(line) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::error!(line, error = %err, "skipping unparsable list entry");
                    continue;
                }
            };
            let target_dir = match dir {
                Some(dir) => PathBuf::from(dir).join(&host),
                None => PathBuf::from(host),
            };
            if let Err(err) = self.run(&base_url, &target_dir, force, keep) {
                tracing::error!(url = base_url, error = %err, "clone failed, continuing with next list entry");
            }
        }
        Ok(())
    }

    fn run(&self, base_url: &str, base_dir: &Path, force: bool, keep: bool) -> Result<(), Error> {
        prepare_destination(base_dir, force, keep)?;
        let git_dir = base_dir.join(".git");
        std::fs::create_dir_all(&git_dir)?;

        let client = crate::http::build_client(self.max_parallel + 250)?;
        let gate = Arc::new(Gate::new());
        let ref_registry = Arc::new(RefRegistry::new());
        let object_registry = Arc::new(ObjectRegistry::new());

        // Phase 1: HEAD probe.
        self.probe_head(&client, base_url, base_dir);

        // Phase 2: directory-listing probe, with early return on success.
        if self.probe_listing(&client, gate.clone(), base_url, base_dir) {
            self.checkout(base_dir);
            self.ignored_pass(&client, gate, base_url, base_dir);
            return Ok(());
        }

        // Phase 3: common files.
        self.fetch_common_files(&client, gate.clone(), base_url, base_dir);

        // Phase 4: common refs.
        self.fetch_common_refs(&client, gate.clone(), ref_registry.clone(), base_url, base_dir);

        // Phase 5: packs.
        self.fetch_packs(&client, gate.clone(), base_url, base_dir);

        // Phase 6: object-set assembly.
        let mut objects = ObjectSet::new();
        self.assemble_object_set(&git_dir, &mut objects);

        // Phase 7: commit graphs.
        self.fetch_commit_graphs(&client, gate.clone(), base_url, base_dir, &mut objects);

        // Phase 8: object fetch.
        self.fetch_objects(&client, gate.clone(), object_registry, base_url, base_dir, &git_dir, objects);

        // Phase 9: repair pass.
        if let Ok(entries) = crate::indexstore::read_entries(&git_dir.join("index")) {
            crate::repair::run(&entries, base_dir, &git_dir, base_url, client.clone(), gate.clone(), self.max_parallel);
        }

        // Phase 10: checkout.
        self.checkout(base_dir);

        // Phase 11: LFS.
        crate::lfs::run(base_dir, base_url, client.clone(), gate.clone(), self.max_parallel);

        // Phase 12: ignored files.
        self.ignored_pass(&client, gate, base_url, base_dir);

        Ok(())
    }

    fn probe_head(&self, client: &reqwest::blocking::Client, base_url: &str, base_dir: &Path) {
        let uri = crate::paths::join(base_url, ".git/HEAD");
        match crate::http::get(client, &uri) {
            Ok(resp) if resp.status.is_success() => {
                if !resp.body.starts_with(b"ref: ") {
                    tracing::warn!(uri, "HEAD does not look like a symbolic ref");
                }
                let target = base_dir.join(".git/HEAD");
                if crate::paths::create_parent_dirs(&target).is_ok() {
                    let _ = std::fs::write(&target, &resp.body);
                }
            }
            Ok(resp) => tracing::warn!(uri, code = resp.status.as_u16(), "HEAD probe did not succeed"),
            Err(err) => tracing::warn!(uri, error = %err, "HEAD probe failed"),
        }
    }

    /// Returns `true` if the recursive-listing path was taken and completed.
    fn probe_listing(&self, client: &reqwest::blocking::Client, gate: Arc<Gate>, base_url: &str, base_dir: &Path) -> bool {
        let uri = crate::paths::join(base_url, ".git/");
        let resp = match crate::http::get(client, &uri) {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(uri, error = %err, "directory listing probe failed");
                return false;
            }
        };
        if !resp.status.is_success() || !crate::paths::looks_like_html(&resp.body) {
            return false;
        }
        if !crate::dirlisting::contains_entry(&resp.body, "HEAD") {
            return false;
        }

        tracing::info!("server exposes a directory listing, switching to recursive crawl");
        let ctx = Context::strict(client.clone(), gate, base_url.to_owned(), base_dir.to_owned());
        let tracker = JobTracker::new(self.max_parallel);
        for entry in crate::dirlisting::entries(&resp.body) {
            tracker.add_job(crate::paths::join(".git/", &entry.href));
        }
        tracker.start_and_wait(ctx, true, move |handle, job, ctx| {
            recursive::run(handle, job, ctx);
        });
        true
    }

    fn fetch_common_files(&self, client: &reqwest::blocking::Client, gate: Arc<Gate>, base_url: &str, base_dir: &Path) {
        let ctx = Context::strict(client.clone(), gate, base_url.to_owned(), base_dir.to_owned());
        let tracker = JobTracker::new(self.max_parallel);
        tracker.add_jobs(crate::paths::COMMON_FILES.iter().map(|p| p.to_string()));
        tracker.start_and_wait(ctx, false, move |handle, job, ctx| {
            download::run(handle, job, ctx);
        });
    }

    fn fetch_common_refs(
        &self,
        client: &reqwest::blocking::Client,
        gate: Arc<Gate>,
        registry: Arc<RefRegistry>,
        base_url: &str,
        base_dir: &Path,
    ) {
        let inner = Context::strict(client.clone(), gate, base_url.to_owned(), base_dir.to_owned());
        let ctx = findref::RefContext { inner, registry };
        let tracker = JobTracker::new(self.max_parallel);
        tracker.add_jobs(crate::paths::COMMON_REFS.iter().map(|p| p.to_string()));
        tracker.start_and_wait(ctx, true, move |handle, job, ctx| {
            findref::run(handle, job, ctx);
        });
    }

    fn fetch_packs(&self, client: &reqwest::blocking::Client, gate: Arc<Gate>, base_url: &str, base_dir: &Path) {
        let packs_list = base_dir.join(".git/objects/info/packs");
        let Ok(body) = std::fs::read(&packs_list) else {
            return;
        };
        let mut jobs = Vec::new();
        for id in crate::refparse::find_pack_ids(&body) {
            for ext in [".idx", ".pack", ".rev"] {
                jobs.push(format!(".git/objects/pack/pack-{id}{ext}"));
            }
        }
        if jobs.is_empty() {
            return;
        }
        let ctx = Context::strict(client.clone(), gate, base_url.to_owned(), base_dir.to_owned());
        let tracker = JobTracker::new(self.max_parallel);
        tracker.add_jobs(jobs);
        tracker.start_and_wait(ctx, false, move |handle, job, ctx| {
            download::run(handle, job, ctx);
        });
    }

    fn assemble_object_set(&self, git_dir: &Path, objects: &mut ObjectSet) {
        const SCAN_FILES: &[&str] = &[
            "packed-refs",
            "info/refs",
            "info/grafts",
            "FETCH_HEAD",
            "ORIG_HEAD",
            "HEAD",
            "objects/loose-object-idx",
            "objects/info/commit-graphs/commit-graph-chain",
            "objects/info/alternates",
            "objects/info/http-alternates",
        ];
        for name in SCAN_FILES {
            if let Ok(body) = std::fs::read(git_dir.join(name)) {
                objects.scan(&body);
            }
        }

        for subdir in ["refs", "logs"] {
            scan_dir_recursive(&git_dir.join(subdir), objects);
        }

        synthesize_reflog_only_refs(git_dir);
        // Re-scan refs/ now that any synthesized files exist, and logs/ to make sure they're
        // in the object set regardless of scan order above.
        scan_dir_recursive(&git_dir.join("refs"), objects);

        if let Ok(entries) = crate::indexstore::read_entries(&git_dir.join("index")) {
            for entry in entries {
                objects.insert(entry.id);
            }
        }

        if let Ok(store) = ObjectStore::open(git_dir) {
            if let Ok(ids) = store.all_hashes() {
                objects.extend(ids);
            }
        }
    }

    fn fetch_commit_graphs(
        &self,
        client: &reqwest::blocking::Client,
        gate: Arc<Gate>,
        base_url: &str,
        base_dir: &Path,
        objects: &mut ObjectSet,
    ) {
        let git_dir = base_dir.join(".git");

        let standalone = git_dir.join("objects/info/commit-graph");
        if standalone.exists() {
            self.union_commit_graph(&standalone, objects);
        }

        let chain_path = git_dir.join("objects/info/commit-graphs/commit-graph-chain");
        let Ok(chain) = std::fs::read_to_string(&chain_path) else {
            return;
        };
        let ids: Vec<&str> = chain.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if ids.is_empty() {
            return;
        }

        let ctx = Context::strict(client.clone(), gate, base_url.to_owned(), base_dir.to_owned());
        let tracker = JobTracker::new(self.max_parallel);
        tracker.add_jobs(
            ids.iter()
                .map(|id| format!(".git/objects/info/commit-graphs/graph-{id}.graph")),
        );
        tracker.start_and_wait(ctx, false, move |handle, job, ctx| {
            download::run(handle, job, ctx);
        });

        for id in ids {
            let graph_path = git_dir.join(format!("objects/info/commit-graphs/graph-{id}.graph"));
            if graph_path.exists() {
                self.union_commit_graph(&graph_path, objects);
            }
        }
    }

    fn union_commit_graph(&self, path: &Path, objects: &mut ObjectSet) {
        match crate::commitgraph::commit_and_tree_hashes(path) {
            Ok(pairs) => {
                for (commit, tree) in pairs {
                    objects.insert(commit);
                    objects.insert(tree);
                }
            }
            Err(err) => tracing::warn!(file = %path.display(), error = %err, "couldn't parse commit graph"),
        }
    }

    fn fetch_objects(
        &self,
        client: &reqwest::blocking::Client,
        gate: Arc<Gate>,
        registry: Arc<ObjectRegistry>,
        base_url: &str,
        base_dir: &Path,
        git_dir: &Path,
        objects: ObjectSet,
    ) {
        if objects.is_empty() {
            tracing::info!("object set is empty, skipping object fetch phase");
            return;
        }
        let store = match ObjectStore::open(git_dir) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::error!(error = %err, "couldn't open object store, skipping object fetch phase");
                return;
            }
        };
        tracing::info!(count = objects.len(), "fetching objects");

        let ctx = findobjects::ObjectContext {
            client: client.clone(),
            gate,
            base_url: base_url.to_owned(),
            base_dir: base_dir.to_owned(),
            registry,
            store,
        };
        let tracker = JobTracker::new(self.max_parallel);
        tracker.add_jobs(objects.into_vec());
        tracker.start_and_wait(ctx, true, move |handle, job, ctx| {
            findobjects::run(handle, job, ctx);
        });
    }

    fn checkout(&self, base_dir: &Path) {
        tracing::info!(dir = %base_dir.display(), "running git checkout");
        match std::process::Command::new("git")
            .arg("checkout")
            .arg(".")
            .current_dir(base_dir)
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::error!(?status, "git checkout exited with a failure status"),
            Err(err) => tracing::error!(error = %err, "couldn't run git checkout"),
        }
    }

    fn ignored_pass(&self, client: &reqwest::blocking::Client, gate: Arc<Gate>, base_url: &str, base_dir: &Path) {
        crate::ignored::run(base_dir, base_url, client.clone(), gate, self.max_parallel);
    }
}

fn scan_dir_recursive(dir: &Path, objects: &mut ObjectSet) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir_recursive(&path, objects);
        } else if let Ok(body) = std::fs::read(&path) {
            objects.scan(&body);
        }
    }
}

/// For every reflog file under `.git/logs/refs/...` whose corresponding `.git/refs/...`
/// file is missing, create that ref file containing the id from the last reflog entry's
/// second column.
fn synthesize_reflog_only_refs(git_dir: &Path) {
    synthesize_in(&git_dir.join("logs/refs"), &git_dir.join("refs"), git_dir);
}

fn synthesize_in(logs_dir: &Path, _refs_root: &Path, git_dir: &Path) {
    let Ok(read_dir) = std::fs::read_dir(logs_dir) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.is_dir() {
            synthesize_in(&path, _refs_root, git_dir);
            continue;
        }
        let Ok(relative) = path.strip_prefix(git_dir.join("logs")) else {
            continue;
        };
        let ref_path = git_dir.join(relative);
        if ref_path.exists() {
            continue;
        }
        let Ok(body) = std::fs::read(&path) else {
            continue;
        };
        let Some(target) = crate::refparse::last_reflog_target(&body) else {
            continue;
        };
        if crate::paths::create_parent_dirs(&ref_path).is_ok() {
            if let Err(err) = std::fs::write(&ref_path, format!("{target}\n")) {
                tracing::error!(file = %ref_path.display(), error = %err, "couldn't synthesize ref from reflog");
            } else {
                tracing::info!(file = %ref_path.display(), "synthesized ref from reflog-only history");
            }
        }
    }
}

/// Strips `/`, `/HEAD`, then `/.git` from the input, in that order, defaults an empty
/// scheme to `http`, and returns the normalized base URL along with a default directory
/// name derived from the host.
fn normalize_url(input: &str) -> Result<(String, String), Error> {
    let mut trimmed = input.trim();
    trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed = trimmed.strip_suffix("/HEAD").unwrap_or(trimmed);
    trimmed = trimmed.strip_suffix("/.git").unwrap_or(trimmed);

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| Error::InvalidUrl(input.to_owned(), e))?;
    let host = url.host_str().unwrap_or("repo").to_owned();
    Ok((with_scheme, host))
}

fn prepare_destination(dir: &Path, force: bool, keep: bool) -> Result<(), Error> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(Error::DestinationIsFile { path: dir.to_owned() });
    }
    let empty = crate::paths::dir_is_empty(dir)?;
    if empty {
        return Ok(());
    }
    if force {
        std::fs::remove_dir_all(dir)?;
        std::fs::create_dir_all(dir)?;
        Ok(())
    } else if keep {
        Ok(())
    } else {
        Err(Error::DestinationExists { path: dir.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_head_and_dotgit_in_order() {
        let (url, host) = normalize_url("example.com/repo/.git/HEAD").unwrap();
        assert_eq!(url, "http://example.com/repo");
        assert_eq!(host, "example.com");
    }

    #[test]
    fn normalize_strips_only_one_round_of_suffixes() {
        // `/.git/HEAD` strips down to `/.git` then `/.git` itself is also a recognized
        // suffix, so a lone `.git/HEAD` collapses all the way to the repo root - but a
        // trailing `/HEAD` alone (no `.git`) only loses the `/HEAD` part.
        let (url, _) = normalize_url("example.com/repo/HEAD").unwrap();
        assert_eq!(url, "http://example.com/repo");
    }

    #[test]
    fn normalize_defaults_scheme_to_http() {
        let (url, _) = normalize_url("example.com").unwrap();
        assert_eq!(url, "http://example.com");
    }

    #[test]
    fn normalize_keeps_explicit_scheme() {
        let (url, _) = normalize_url("https://example.com/").unwrap();
        assert_eq!(url, "https://example.com");
    }
}
