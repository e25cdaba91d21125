//! Phase 9, the repair pass: for every file the index says should exist in the working
//! tree, fetch it if it's missing and (once fetched) verify its hash against the index
//! entry before recreating the corresponding object. Finally, restore recorded
//! mode/uid/gid/mtime on every index entry whose file is already present, whether it was
//! just downloaded or was already on disk.

use std::path::Path;
use std::sync::Arc;

use crate::indexstore::Entry;
use crate::jobtracker::JobTracker;
use crate::ratelimit::Gate;
use crate::workers::{createobject, download, Context};

/// Entries whose working-tree path ends in `.php` are skipped: a PHP source file served by
/// the web server almost always means the request was handled dynamically rather than
/// served as a static asset, so the "download" would just capture rendered output instead
/// of the tracked file.
fn is_repairable(path: &str) -> bool {
    !path.ends_with(".php")
}

pub fn run(
    entries: &[Entry],
    base_dir: &Path,
    git_dir: &Path,
    base_url: &str,
    client: reqwest::blocking::Client,
    gate: Arc<Gate>,
    max_parallel: usize,
) {
    let missing: Vec<Entry> = entries
        .iter()
        .filter(|e| is_repairable(&e.path))
        .filter(|e| !base_dir.join(&e.path).exists())
        .cloned()
        .collect();

    if missing.is_empty() {
        tracing::info!("no missing working tree files to repair");
        return;
    }
    tracing::info!(count = missing.len(), "repairing missing working tree files");

    let ctx = Context::permissive(client, gate, base_url.to_owned(), base_dir.to_owned());
    let tracker = JobTracker::new(max_parallel);
    tracker.add_jobs(missing.iter().map(|e| e.path.clone()));
    tracker.start_and_wait(ctx, false, move |handle, job, ctx| {
        download::run(handle, job, ctx);
    });

    let store = match crate::objectstore::ObjectStore::open(git_dir) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(error = %err, "couldn't open object store for the repair pass");
            return;
        }
    };
    let create_ctx = createobject::CreateObjectContext {
        base_dir: base_dir.to_owned(),
        store,
    };
    for entry in &missing {
        createobject::run(entry.clone(), &create_ctx);
    }

    for entry in entries {
        restore_metadata_for(base_dir, entry);
    }
}

#[cfg(unix)]
fn restore_metadata_for(base_dir: &Path, entry: &Entry) {
    let target = base_dir.join(&entry.path);
    if !target.exists() {
        return;
    }
    use nix::unistd::{Gid, Uid};
    if let Err(err) = nix::unistd::chown(&target, Some(Uid::from_raw(entry.uid)), Some(Gid::from_raw(entry.gid))) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore uid/gid");
    }
    let mode = nix::sys::stat::Mode::from_bits_truncate(entry.mode & 0o7777);
    if let Err(err) = nix::sys::stat::fchmodat(None, &target, mode, nix::sys::stat::FchmodatFlags::FollowSymlink) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore file mode");
    }
    let mtime = filetime::FileTime::from_unix_time(entry.mtime_secs, 0);
    if let Err(err) = filetime::set_file_mtime(&target, mtime) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore mtime");
    }
}

#[cfg(not(unix))]
fn restore_metadata_for(base_dir: &Path, entry: &Entry) {
    let target = base_dir.join(&entry.path);
    if !target.exists() {
        return;
    }
    let mtime = filetime::FileTime::from_unix_time(entry.mtime_secs, 0);
    if let Err(err) = filetime::set_file_mtime(&target, mtime) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore mtime");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn php_files_are_not_repaired() {
        assert!(!is_repairable("admin/login.php"));
        assert!(is_repairable("src/main.rs"));
    }
}
