//! The repair pass's object-creation worker (§4.8): given an index entry whose working-tree
//! file was just downloaded, restore its recorded mode/uid/gid/mtime, then verify its
//! content hash against what the index recorded before inserting it into the object
//! database as a blob. A mismatch means the server served us something other than the
//! tracked file (a custom error page, a redirect target, ...) and the recovered bytes are
//! discarded rather than poisoning the object store.

use std::sync::Arc;

use crate::indexstore::Entry;
use crate::objectstore::ObjectStore;

pub struct CreateObjectContext {
    pub base_dir: std::path::PathBuf,
    pub store: Arc<ObjectStore>,
}

/// `git hash-object`'s algorithm: sha1 over `"blob <len>\0"` followed by the content,
/// matching what `plumbing.ComputeHash(plumbing.BlobObject, content)` does upstream.
fn blob_hash(bytes: &[u8]) -> git_hash::ObjectId {
    let mut hasher = git_hash::hasher(git_hash::Kind::Sha1);
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    hasher.digest().into()
}

pub fn run(entry: Entry, ctx: &CreateObjectContext) {
    let target = ctx.base_dir.join(&entry.path);
    if !target.exists() {
        return;
    }

    restore_metadata(&target, &entry);

    let bytes = match std::fs::read(&target) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(file = entry.path, error = %err, "couldn't read recovered file");
            return;
        }
    };

    let computed = blob_hash(&bytes);
    if computed != entry.id {
        tracing::warn!(
            file = entry.path,
            expected = %entry.id,
            got = %computed,
            "recovered file does not match the hash recorded in the index, discarding"
        );
        return;
    }

    match ctx.store.insert_blob(&bytes) {
        Ok(_) => tracing::info!(file = entry.path, obj = %entry.id, "recreated object from working tree file"),
        Err(err) => tracing::error!(file = entry.path, error = %err, "couldn't write recovered object"),
    }
}

#[cfg(unix)]
fn restore_metadata(target: &std::path::Path, entry: &Entry) {
    use nix::unistd::{Gid, Uid};

    if let Err(err) = nix::unistd::chown(target, Some(Uid::from_raw(entry.uid)), Some(Gid::from_raw(entry.gid))) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore uid/gid");
    }

    let mode = nix::sys::stat::Mode::from_bits_truncate(entry.mode & 0o7777);
    if let Err(err) = nix::sys::stat::fchmodat(
        None,
        target,
        mode,
        nix::sys::stat::FchmodatFlags::FollowSymlink,
    ) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore file mode");
    }

    let mtime = filetime::FileTime::from_unix_time(entry.mtime_secs, 0);
    if let Err(err) = filetime::set_file_mtime(target, mtime) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore mtime");
    }
}

#[cfg(not(unix))]
fn restore_metadata(target: &std::path::Path, entry: &Entry) {
    let mtime = filetime::FileTime::from_unix_time(entry.mtime_secs, 0);
    if let Err(err) = filetime::set_file_mtime(target, mtime) {
        tracing::debug!(file = entry.path, error = %err, "couldn't restore mtime");
    }
}
