//! De-duplication registries: per-kind sets ensuring each ref path / object id is
//! processed by its worker at most once.
//!
//! Both registries live on the [`Engine`][crate::Engine] instance rather than behind a
//! global, so that `clone_list` (batch/list mode) starts each target with an empty
//! registry instead of leaking state across entries — see the design note in the top
//! level spec about scoping these to one invocation.

use std::collections::HashSet;
use std::sync::Mutex;

use git_hash::ObjectId;

/// Tracks which `.git/`-relative ref paths the ref-discovery worker has already handled.
#[derive(Default)]
pub struct RefRegistry(Mutex<HashSet<String>>);

impl RefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `path` had not been seen before, inserting it atomically.
    /// Callers should treat a `false` result as "skip, someone else owns this".
    pub fn insert_if_new(&self, path: &str) -> bool {
        let mut seen = self.0.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(path.to_owned())
    }
}

/// Tracks which object ids the object-discovery worker has already expanded.
#[derive(Default)]
pub struct ObjectRegistry(Mutex<HashSet<ObjectId>>);

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_if_new(&self, id: ObjectId) -> bool {
        let mut seen = self.0.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_registry_dedupes() {
        let reg = RefRegistry::new();
        assert!(reg.insert_if_new(".git/refs/heads/main"));
        assert!(!reg.insert_if_new(".git/refs/heads/main"));
        assert!(reg.insert_if_new(".git/refs/heads/dev"));
    }

    #[test]
    fn object_registry_dedupes() {
        let reg = ObjectRegistry::new();
        let id = ObjectId::null(git_hash::Kind::Sha1);
        assert!(reg.insert_if_new(id));
        assert!(!reg.insert_if_new(id));
    }
}
