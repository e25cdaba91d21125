//! Wraps `git-object` (black-box per the design) to pull the set of hashes a decoded
//! object refers to: a tree's entries, a commit's tree + parents, a tag's target. Blobs
//! never reference other objects.

use git_hash::ObjectId;
use git_object::{Kind, ObjectRef};

/// Every hash `data` (of kind `kind`) refers to. A decode failure yields an empty list —
/// logged by the caller, not propagated, per the "parse/decode failure" error kind.
pub fn referenced_hashes(kind: Kind, data: &[u8]) -> Vec<ObjectId> {
    match ObjectRef::from_bytes(kind, data) {
        Ok(ObjectRef::Commit(commit)) => {
            let mut hashes = vec![commit.tree()];
            hashes.extend(commit.parents());
            hashes
        }
        Ok(ObjectRef::Tree(tree)) => tree.entries.iter().map(|entry| entry.oid.to_owned()).collect(),
        Ok(ObjectRef::Tag(tag)) => vec![tag.target()],
        Ok(ObjectRef::Blob(_)) => Vec::new(),
        Err(err) => {
            tracing::warn!(?kind, error = %err, "couldn't decode object, skipping reference discovery");
            Vec::new()
        }
    }
}
