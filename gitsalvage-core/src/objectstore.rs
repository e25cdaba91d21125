//! Thin handle over `git-odb` (black-box per the design): loose + pack object access with
//! its own LRU, plus insertion of newly recovered blobs.

use std::io::Cursor;
use std::path::Path;

use git_hash::ObjectId;
use git_odb::{Find, FindExt, Write};

mod error {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to open the object database at {path}")]
        Open {
            path: std::path::PathBuf,
            #[source]
            source: git_odb::at::Error,
        },
        #[error(transparent)]
        Find(#[from] git_odb::find::Error),
        #[error(transparent)]
        Write(#[from] git_odb::general::write::Error),
        #[error(transparent)]
        Iterate(#[from] git_odb::store::iter::Error),
    }
}
pub use error::Error;

/// Handle to the on-disk object database rooted at `<base_dir>/.git/objects`.
pub struct ObjectStore {
    handle: git_odb::Handle,
}

impl ObjectStore {
    pub fn open(git_dir: &Path) -> Result<Self, Error> {
        let objects_dir = git_dir.join("objects");
        let handle = git_odb::at(&objects_dir).map_err(|source| Error::Open {
            path: objects_dir,
            source,
        })?;
        Ok(Self { handle })
    }

    /// Does the object database already have `id`, either loose or packed?
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.handle.contains(id)
    }

    /// Read and decode-ready bytes for `id`, along with its kind.
    pub fn read(&self, id: &ObjectId) -> Result<Option<(git_object::Kind, Vec<u8>)>, Error> {
        let mut buf = Vec::new();
        match self.handle.try_find(id, &mut buf)? {
            Some(data) => Ok(Some((data.kind, data.data.to_vec()))),
            None => Ok(None),
        }
    }

    /// Insert `bytes` as a new loose blob object, returning its computed id. Used by the
    /// repair pass once a recovered working-tree file's hash has been verified against the
    /// index.
    pub fn insert_blob(&self, bytes: &[u8]) -> Result<ObjectId, Error> {
        Ok(self
            .handle
            .write_stream(git_object::Kind::Blob, bytes.len() as u64, Cursor::new(bytes), git_hash::Kind::Sha1)?)
    }

    /// Every object hash currently known to the store, loose and packed.
    pub fn all_hashes(&self) -> Result<Vec<ObjectId>, Error> {
        let mut ids = Vec::new();
        for id in self.handle.iter()? {
            ids.push(id?);
        }
        Ok(ids)
    }
}
