//! The object set assembled in phase 6: every hash the orchestrator can find by scanning
//! already-downloaded artifacts, before phase 8 hands them all to the object workers.

use std::collections::HashSet;

use git_hash::ObjectId;

#[derive(Default)]
pub struct ObjectSet(HashSet<ObjectId>);

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ObjectId) {
        self.0.insert(id);
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.0.extend(ids);
    }

    /// Scans `body` for bare 40/64-hex object ids (as found in `packed-refs`, `info/refs`,
    /// `info/grafts`, `FETCH_HEAD`, `ORIG_HEAD`, loose ref files, reflog lines, and
    /// `objects/info/packs`) and inserts every match.
    pub fn scan(&mut self, body: &[u8]) {
        for hex in crate::refparse::find_object_ids(body) {
            if let Ok(id) = ObjectId::from_hex(hex.as_bytes()) {
                self.0.insert(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<ObjectId> {
        self.0.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_collects_hashes_from_packed_refs_style_body() {
        let mut set = ObjectSet::new();
        set.scan(b"# pack-refs with: peeled fully-peeled sorted\nda39a3ee5e6b4b0d3255bfef95601890afd80709 refs/heads/main\n");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn dedupes_across_scans() {
        let mut set = ObjectSet::new();
        set.scan(b"da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        set.scan(b"da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        assert_eq!(set.len(), 1);
    }
}
