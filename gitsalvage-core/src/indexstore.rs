//! Wraps `git-index` (black-box per the design) to decode `.git/index` into the handful of
//! fields the repair pass and phase-6 object-set assembly actually need: hash, work-tree
//! path, POSIX mode, uid/gid, and mtime.

use std::path::Path;

use git_hash::ObjectId;

mod error {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to decode git index at {path}")]
        Decode {
            path: std::path::PathBuf,
            #[source]
            source: git_index::file::init::Error,
        },
    }
}
pub use error::Error;

/// One decoded index entry.
#[derive(Clone)]
pub struct Entry {
    /// Path relative to the work tree root, e.g. `src/main.rs`.
    pub path: String,
    pub id: ObjectId,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime_secs: i64,
}

/// Decode every entry out of `.git/index`.
pub fn read_entries(index_path: &Path) -> Result<Vec<Entry>, Error> {
    let file = git_index::File::at(index_path, Default::default()).map_err(|source| Error::Decode {
        path: index_path.to_owned(),
        source,
    })?;

    Ok(file
        .entries()
        .iter()
        .map(|entry| Entry {
            path: entry.path(&file).to_string(),
            id: entry.id,
            mode: entry.mode.bits(),
            uid: entry.stat.uid,
            gid: entry.stat.gid,
            mtime_secs: entry.stat.mtime.secs as i64,
        })
        .collect())
}
