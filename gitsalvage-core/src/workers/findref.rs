//! The ref-discovery worker (§4.4): fetches a `.git/...` path and, whether the body came
//! fresh off the wire or was already on disk, mines it for further ref paths, FETCH_HEAD
//! branch names, and config-declared remote-tracking branches.

use std::sync::Arc;

use super::{fetch, Context, Fetched};
use crate::dedup::RefRegistry;
use crate::jobtracker::Handle;

#[derive(Clone)]
pub struct RefContext {
    pub inner: Context,
    pub registry: Arc<RefRegistry>,
}

pub fn run(handle: &Handle<String>, path: String, ctx: &RefContext) {
    if !ctx.registry.insert_if_new(&path) {
        return;
    }

    let body = match fetch(&ctx.inner, &path) {
        Fetched::Cached(body) | Fetched::Downloaded(body) => body,
        Fetched::Skip => return,
        Fetched::Retry => {
            handle.add_job(path);
            return;
        }
    };

    expand(handle, &path, &body);
}

/// Shared with phase 6, which re-runs this over files already sitting on disk without
/// going through the worker/registry machinery.
pub fn expand(handle: &Handle<String>, path: &str, body: &[u8]) {
    for ref_path in crate::refparse::find_ref_paths(body) {
        handle.add_job(crate::paths::join(".git", &ref_path));
        handle.add_job(crate::paths::join(".git/logs", &ref_path));
    }

    if path == ".git/FETCH_HEAD" {
        // Known limitation, preserved intentionally: the remote is always assumed to be
        // `origin`, matching upstream's TODO rather than trying to recover the real name.
        for branch in crate::refparse::find_fetch_head_branches(body) {
            handle.add_job(format!(".git/refs/remotes/origin/{branch}"));
            handle.add_job(format!(".git/logs/refs/remotes/origin/{branch}"));
        }
    }

    if path == ".git/config" || path == ".git/config.worktree" {
        match crate::gitconfig::branch_remotes(body) {
            Ok(remotes) => {
                for br in remotes {
                    handle.add_job(format!(".git/refs/remotes/{}/{}", br.remote, br.branch));
                    handle.add_job(format!(".git/logs/refs/remotes/{}/{}", br.remote, br.branch));
                }
            }
            Err(err) => {
                tracing::error!(file = path, error = %err, "failed to parse git config");
            }
        }
    }
}
