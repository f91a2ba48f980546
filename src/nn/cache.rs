//! Read-through LRU cache over filename → [`FileRecord`] redirection lookups
//! (§4.10), backed by `moka::sync::Cache` the way the teacher reaches for `moka`
//! for its own bounded caches.

use moka::sync::Cache;

use crate::nn::state::FileRecord;

pub struct RecordCache {
    inner: Cache<String, FileRecord>,
}

impl RecordCache {
    pub fn new(capacity: u64) -> Self {
        Self { inner: Cache::builder().max_capacity(capacity).build() }
    }

    pub fn get(&self, filename: &str) -> Option<FileRecord> {
        self.inner.get(filename)
    }

    pub fn put(&self, filename: String, record: FileRecord) {
        self.inner.insert(filename, record);
    }

    pub fn remove(&self, filename: &str) {
        self.inner.invalidate(filename);
    }

    #[cfg(test)]
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}
