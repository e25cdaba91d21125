//! Wraps `git-commitgraph` (black-box per the design) to pull commit and tree hashes out
//! of a single commit-graph file, used by phase 7 for both the standalone
//! `objects/info/commit-graph` file and each `graph-<id>.graph` member of a chain.

use std::path::Path;

use git_hash::ObjectId;

mod error {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to open commit-graph file {path}")]
        Open {
            path: std::path::PathBuf,
            #[source]
            source: git_commitgraph::file::init::Error,
        },
    }
}
pub use error::Error;

/// Every commit id in the graph file, paired with that commit's root tree id.
pub fn commit_and_tree_hashes(path: &Path) -> Result<Vec<(ObjectId, ObjectId)>, Error> {
    let file = git_commitgraph::File::at(path).map_err(|source| Error::Open {
        path: path.to_owned(),
        source,
    })?;

    Ok(file
        .iter_commits()
        .map(|commit| (commit.id().to_owned(), commit.root_tree_id().to_owned()))
        .collect())
}
