//! Storage Node content, metadata, undo and checkpoint state (§3, §4.7).
//!
//! The per-file `Arc<RwLock<()>>` from [`crate::sn::lock_table::LockTable`] is what
//! serializes operations on a single file (§4.8); the `std::sync::Mutex`-guarded
//! `HashMap` underneath it is only ever held for the short get/insert/remove that
//! reads or writes a file's in-memory entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::SnConfig;
use crate::edit;
use crate::error::Error;
use crate::sn::backend::StorageBackend;
use crate::sn::lock_table::LockTable;

pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "R" => Some(Permission::Read),
            "W" => Some(Permission::Write),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "R",
            Permission::Write => "W",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub owner: String,
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub last_accessed_by: String,
    pub word_count: u64,
    pub char_count: u64,
    pub acl: HashMap<String, Permission>,
}

impl FileMetadata {
    fn can_read(&self, user: &str) -> bool {
        user == self.owner || self.acl.contains_key(user)
    }

    fn can_write(&self, user: &str) -> bool {
        user == self.owner || matches!(self.acl.get(user), Some(Permission::Write))
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointEntry {
    pub content: String,
    pub timestamp: u64,
}

struct FileEntry {
    metadata: FileMetadata,
    body: String,
    undo: Option<String>,
}

/// Human-readable info record returned by Info/FileInfo.
pub struct FileInfo {
    pub owner: String,
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub last_accessed_by: String,
    pub word_count: u64,
    pub char_count: u64,
    pub size: usize,
    pub acl: Vec<(String, Permission)>,
}

pub struct SnState {
    backend: Arc<dyn StorageBackend>,
    locks: LockTable,
    files: Mutex<HashMap<String, FileEntry>>,
    checkpoints: Mutex<HashMap<(String, String), CheckpointEntry>>,
    pub config: SnConfig,
}

impl SnState {
    pub fn new(backend: Arc<dyn StorageBackend>, config: SnConfig) -> Self {
        Self { backend, locks: LockTable::new(), files: Mutex::new(HashMap::new()), checkpoints: Mutex::new(HashMap::new()), config }
    }

    fn files_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FileEntry>> {
        self.files.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn checkpoints_lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), CheckpointEntry>> {
        self.checkpoints.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub async fn create(&self, filename: &str, owner: &str) -> Result<(), Error> {
        let _guard = self.locks.write(filename).await;
        {
            let mut files = self.files_lock();
            if files.contains_key(filename) {
                return Err(Error::FileExists);
            }
            let now = now_secs();
            files.insert(
                filename.to_owned(),
                FileEntry {
                    metadata: FileMetadata {
                        owner: owner.to_owned(),
                        created: now,
                        modified: now,
                        accessed: now,
                        last_accessed_by: owner.to_owned(),
                        word_count: 0,
                        char_count: 0,
                        acl: HashMap::new(),
                    },
                    body: String::new(),
                    undo: None,
                },
            );
        }
        self.backend.save(filename, b"").await?;
        Ok(())
    }

    pub async fn read(&self, filename: &str, user: &str) -> Result<String, Error> {
        let _guard = self.locks.read(filename).await;
        let mut files = self.files_lock();
        let entry = files.get_mut(filename).ok_or(Error::FileNotFound)?;
        if !entry.metadata.can_read(user) {
            return Err(Error::PermissionDenied);
        }
        entry.metadata.accessed = now_secs();
        entry.metadata.last_accessed_by = user.to_owned();
        Ok(entry.body.clone())
    }

    /// WriteCommit (§4.7): parses and applies `edit_payload`, snapshotting the
    /// pre-commit body into the undo slot first — even for a no-op edit list
    /// (§8 round-trip property). Returns the recomputed stats so the caller can
    /// relay them back to the Name Node's cached `FileRecord` (see
    /// `NnState::touch`); the SN itself has no connection back to the NN to push
    /// this on its own.
    pub async fn write_commit(&self, filename: &str, user: &str, edit_payload: &str) -> Result<edit::Stats, Error> {
        let script = edit::parse_edit_script(edit_payload)?;
        let _guard = self.locks.write(filename).await;

        let (new_body, stats) = {
            let mut files = self.files_lock();
            let entry = files.get_mut(filename).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_write(user) {
                return Err(Error::PermissionDenied);
            }
            let new_body = edit::apply_edit(&entry.body, &script)?;
            entry.undo = Some(entry.body.clone());
            entry.body = new_body.clone();
            let stats = edit::compute_stats(&new_body);
            entry.metadata.word_count = stats.word_count;
            entry.metadata.char_count = stats.char_count;
            entry.metadata.modified = now_secs();
            (new_body, stats)
        };
        self.backend.save(filename, new_body.as_bytes()).await?;
        Ok(stats)
    }

    pub async fn delete(&self, filename: &str, user: &str) -> Result<(), Error> {
        {
            let _guard = self.locks.write(filename).await;
            let mut files = self.files_lock();
            let entry = files.get(filename).ok_or(Error::FileNotFound)?;
            if entry.metadata.owner != user {
                return Err(Error::Unauthorized);
            }
            files.remove(filename);
        }
        self.backend.remove(filename).await?;
        self.locks.evict_if_unused(filename).await;
        Ok(())
    }

    /// Undo (§4.7, §8 invariant 3): swaps body and undo slot; depth-one toggle.
    pub async fn undo(&self, filename: &str, user: &str) -> Result<(), Error> {
        let new_body = {
            let _guard = self.locks.write(filename).await;
            let mut files = self.files_lock();
            let entry = files.get_mut(filename).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_write(user) {
                return Err(Error::PermissionDenied);
            }
            let previous = entry.undo.take().unwrap_or_default();
            entry.undo = Some(std::mem::replace(&mut entry.body, previous.clone()));
            let stats = edit::compute_stats(&entry.body);
            entry.metadata.word_count = stats.word_count;
            entry.metadata.char_count = stats.char_count;
            entry.metadata.modified = now_secs();
            entry.body.clone()
        };
        self.backend.save(filename, new_body.as_bytes()).await?;
        Ok(())
    }

    pub async fn info(&self, filename: &str, user: &str) -> Result<FileInfo, Error> {
        let _guard = self.locks.read(filename).await;
        let files = self.files_lock();
        let entry = files.get(filename).ok_or(Error::FileNotFound)?;
        if !entry.metadata.can_read(user) {
            return Err(Error::PermissionDenied);
        }
        let meta = &entry.metadata;
        Ok(FileInfo {
            owner: meta.owner.clone(),
            created: meta.created,
            modified: meta.modified,
            accessed: meta.accessed,
            last_accessed_by: meta.last_accessed_by.clone(),
            word_count: meta.word_count,
            char_count: meta.char_count,
            size: entry.body.len(),
            acl: meta.acl.iter().map(|(u, p)| (u.clone(), *p)).collect(),
        })
    }

    /// Stream (§4.7): the body tokenised into words, for paced client display.
    pub async fn stream(&self, filename: &str, user: &str) -> Result<Vec<String>, Error> {
        let _guard = self.locks.read(filename).await;
        let mut files = self.files_lock();
        let entry = files.get_mut(filename).ok_or(Error::FileNotFound)?;
        if !entry.metadata.can_read(user) {
            return Err(Error::PermissionDenied);
        }
        entry.metadata.accessed = now_secs();
        entry.metadata.last_accessed_by = user.to_owned();
        let words = edit::split_sentences(&entry.body).iter().flat_map(|s| edit::split_words(s)).collect();
        Ok(words)
    }

    pub async fn copy(&self, src: &str, dst: &str, user: &str) -> Result<(), Error> {
        let body = {
            let _guard = self.locks.read(src).await;
            let files = self.files_lock();
            let entry = files.get(src).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_read(user) {
                return Err(Error::PermissionDenied);
            }
            entry.body.clone()
        };

        {
            let _guard = self.locks.write(dst).await;
            let mut files = self.files_lock();
            if files.contains_key(dst) {
                return Err(Error::FileExists);
            }
            let now = now_secs();
            let stats = edit::compute_stats(&body);
            files.insert(
                dst.to_owned(),
                FileEntry {
                    metadata: FileMetadata {
                        owner: user.to_owned(),
                        created: now,
                        modified: now,
                        accessed: now,
                        last_accessed_by: user.to_owned(),
                        word_count: stats.word_count,
                        char_count: stats.char_count,
                        acl: HashMap::new(),
                    },
                    body: body.clone(),
                    undo: None,
                },
            );
        }
        self.backend.save(dst, body.as_bytes()).await?;
        Ok(())
    }

    fn mutate_acl(
        &self,
        filename: &str,
        owner: &str,
        target: &str,
        perm: Option<Permission>,
    ) -> Result<(), Error> {
        let mut files = self.files_lock();
        let entry = files.get_mut(filename).ok_or(Error::FileNotFound)?;
        if entry.metadata.owner != owner {
            return Err(Error::Unauthorized);
        }
        match perm {
            Some(perm) => {
                if entry.metadata.acl.contains_key(target) {
                    return Err(Error::FileExists);
                }
                if entry.metadata.acl.len() >= self.config.max_acl_entries {
                    return Err(Error::InvalidParameters);
                }
                entry.metadata.acl.insert(target.to_owned(), perm);
            }
            None => {
                if entry.metadata.acl.remove(target).is_none() {
                    return Err(Error::InvalidParameters);
                }
            }
        }
        Ok(())
    }

    /// AddAccess; `perm_code` is the wire permission letter ("R" or "W"). Already
    /// granted is treated as idempotent success (§4.6: "re-running an approval ...
    /// must not corrupt the ACL").
    pub async fn add_access(&self, filename: &str, owner: &str, target: &str, perm_code: &str) -> Result<(), Error> {
        let _guard = self.locks.write(filename).await;
        let perm = Permission::parse(perm_code).ok_or(Error::InvalidParameters)?;
        match self.mutate_acl(filename, owner, target, Some(perm)) {
            Ok(()) | Err(Error::FileExists) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn rem_access(&self, filename: &str, owner: &str, target: &str) -> Result<(), Error> {
        let _guard = self.locks.write(filename).await;
        self.mutate_acl(filename, owner, target, None)
    }

    /// Checkpoint (§4.7): requires read permission only (§9 open question (i),
    /// resolved in DESIGN.md to preserve source behaviour). Duplicate tags are
    /// rejected since a checkpoint is documented as immutable.
    pub async fn checkpoint(&self, filename: &str, tag: &str, user: &str) -> Result<(), Error> {
        let _guard = self.locks.read(filename).await;
        let body = {
            let files = self.files_lock();
            let entry = files.get(filename).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_read(user) {
                return Err(Error::PermissionDenied);
            }
            entry.body.clone()
        };
        let mut checkpoints = self.checkpoints_lock();
        let key = (filename.to_owned(), tag.to_owned());
        if checkpoints.contains_key(&key) {
            return Err(Error::FileExists);
        }
        checkpoints.insert(key, CheckpointEntry { content: body, timestamp: now_secs() });
        Ok(())
    }

    pub async fn view_checkpoint(&self, filename: &str, tag: &str, user: &str) -> Result<String, Error> {
        let _guard = self.locks.read(filename).await;
        {
            let files = self.files_lock();
            let entry = files.get(filename).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_read(user) {
                return Err(Error::PermissionDenied);
            }
        }
        let checkpoints = self.checkpoints_lock();
        checkpoints
            .get(&(filename.to_owned(), tag.to_owned()))
            .map(|c| c.content.clone())
            .ok_or(Error::FileNotFound)
    }

    /// Revert (§4.7): snapshots current into the undo slot, then restores the
    /// checkpoint (§8 scenario S5).
    pub async fn revert(&self, filename: &str, tag: &str, user: &str) -> Result<(), Error> {
        let new_body = {
            let _guard = self.locks.write(filename).await;
            let checkpoint_body = {
                let checkpoints = self.checkpoints_lock();
                checkpoints
                    .get(&(filename.to_owned(), tag.to_owned()))
                    .map(|c| c.content.clone())
                    .ok_or(Error::FileNotFound)?
            };
            let mut files = self.files_lock();
            let entry = files.get_mut(filename).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_write(user) {
                return Err(Error::PermissionDenied);
            }
            entry.undo = Some(entry.body.clone());
            entry.body = checkpoint_body.clone();
            let stats = edit::compute_stats(&checkpoint_body);
            entry.metadata.word_count = stats.word_count;
            entry.metadata.char_count = stats.char_count;
            entry.metadata.modified = now_secs();
            checkpoint_body
        };
        self.backend.save(filename, new_body.as_bytes()).await?;
        Ok(())
    }

    pub async fn list_checkpoints(&self, filename: &str, user: &str) -> Result<Vec<(String, u64)>, Error> {
        let _guard = self.locks.read(filename).await;
        {
            let files = self.files_lock();
            let entry = files.get(filename).ok_or(Error::FileNotFound)?;
            if !entry.metadata.can_read(user) {
                return Err(Error::PermissionDenied);
            }
        }
        let checkpoints = self.checkpoints_lock();
        let mut tags: Vec<_> = checkpoints
            .iter()
            .filter(|((f, _), _)| f == filename)
            .map(|((_, tag), c)| (tag.clone(), c.timestamp))
            .collect();
        tags.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(tags)
    }

    /// CreateFolder (§6 "optional single-level folder commands"): a zero-length
    /// marker file, since this rewrite keeps flat filenames.
    pub async fn create_folder(&self, name: &str, owner: &str) -> Result<(), Error> {
        self.create(name, owner).await
    }

    /// Move/rename: requires ownership; fails if `dst` already exists. Checks
    /// `dst` before touching `src` so a rejected rename never loses the source
    /// entry (both filenames' locks are held for the whole operation, which
    /// also rules out a concurrent rename racing in on either name).
    pub async fn rename(&self, src: &str, dst: &str, user: &str) -> Result<(), Error> {
        if src == dst {
            return Err(Error::FileExists);
        }
        let _src_guard = self.locks.write(src).await;
        let _dst_guard = self.locks.write(dst).await;

        let (metadata, body) = {
            let mut files = self.files_lock();
            if files.contains_key(dst) {
                return Err(Error::FileExists);
            }
            let entry = files.get(src).ok_or(Error::FileNotFound)?;
            if entry.metadata.owner != user {
                return Err(Error::Unauthorized);
            }
            let removed = files.remove(src).unwrap();
            (removed.metadata, removed.body)
        };
        {
            let mut files = self.files_lock();
            files.insert(dst.to_owned(), FileEntry { metadata, body: body.clone(), undo: None });
        }
        self.backend.remove(src).await?;
        self.backend.save(dst, body.as_bytes()).await?;
        self.locks.evict_if_unused(src).await;
        Ok(())
    }

    /// ViewFolder: every filename starting with `prefix`.
    pub fn view_folder(&self, prefix: &str) -> Vec<String> {
        let files = self.files_lock();
        let mut names: Vec<_> = files.keys().filter(|f| f.starts_with(prefix)).cloned().collect();
        names.sort();
        names
    }
}
