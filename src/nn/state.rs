//! Name Node registries (§3, §4.2): the process-wide, explicitly-owned state struct
//! that handlers operate over, instead of the global mutable singletons the
//! reference implementation uses (§9 "Global mutable state").

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::NnConfig;
use crate::error::Error;
use crate::nn::cache::RecordCache;

/// Seconds since the Unix epoch; used for every timestamp field in this crate so
/// that the ambient clock stays an injectable, easily-faked dependency (§1).
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// §3 `FileRecord`.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub filename: String,
    pub owner: String,
    pub home_ss_id: u64,
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub last_accessed_by: String,
    pub word_count: u64,
    pub char_count: u64,
}

/// §3 `StorageNodeRecord`.
#[derive(Debug, Clone)]
pub struct StorageNodeRecord {
    pub id: u64,
    pub address: String,
    pub control_port: u16,
    pub client_port: u16,
    pub connected: bool,
    pub last_heartbeat: u64,
    pub file_count: u64,
    pub replica_peer: Option<u64>,
}

impl StorageNodeRecord {
    pub fn client_addr(&self) -> String {
        format!("{}|{}", self.address, self.client_port)
    }
}

/// §3 `UserRecord`.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub identity: String,
    pub address: String,
    pub registered: u64,
}

/// §3 `SentenceLock`.
#[derive(Debug, Clone)]
pub struct SentenceLock {
    pub holder: String,
    pub acquired: u64,
}

/// §3 `AccessRequest`.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub filename: String,
    pub requester: String,
    pub owner: String,
    pub requested: u64,
    pub pending: bool,
}

/// Every mutable registry the Name Node owns, behind the single coarse mutex that
/// §4.2 requires for mutating operations. The cache (§4.10) lives alongside it but
/// is a read-through courtesy layered on top — correctness never depends on it.
pub struct Registry {
    pub files: HashMap<String, FileRecord>,
    pub nodes: HashMap<u64, StorageNodeRecord>,
    pub users: HashMap<String, UserRecord>,
    pub locks: HashMap<(String, u32), SentenceLock>,
    pub access_requests: HashMap<(String, String), AccessRequest>,
    next_node_id: u64,
}

impl Registry {
    fn new() -> Self {
        Self {
            files: HashMap::new(),
            nodes: HashMap::new(),
            users: HashMap::new(),
            locks: HashMap::new(),
            access_requests: HashMap::new(),
            next_node_id: 1,
        }
    }
}

/// Owned Name Node state: the coarse registry mutex plus the LRU read-through cache.
pub struct NnState {
    registry: Mutex<Registry>,
    pub cache: RecordCache,
    pub config: NnConfig,
}

impl NnState {
    pub fn new(config: NnConfig) -> Self {
        let cache = RecordCache::new(config.cache_capacity);
        Self { registry: Mutex::new(Registry::new()), cache, config }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers (or re-registers) a Storage Node, assigning the newest and one
    /// existing node as mutual replica peers on a best-effort basis (§4.2 Register SN).
    pub fn register_storage_node(
        &self,
        address: String,
        control_port: u16,
        client_port: u16,
    ) -> u64 {
        let mut reg = self.lock();

        // Re-registration by address reconnects the existing record (§4.5: "A node
        // that reconnects re-issues registration, which resets `connected` and
        // `last_heartbeat`.").
        if let Some(existing) = reg.nodes.values_mut().find(|n| n.address == address && n.client_port == client_port) {
            existing.connected = true;
            existing.last_heartbeat = now_secs();
            existing.control_port = control_port;
            return existing.id;
        }

        let id = reg.next_node_id;
        reg.next_node_id += 1;
        let peer = reg.nodes.values().find(|n| n.connected).map(|n| n.id);

        reg.nodes.insert(
            id,
            StorageNodeRecord {
                id,
                address,
                control_port,
                client_port,
                connected: true,
                last_heartbeat: now_secs(),
                file_count: 0,
                replica_peer: peer,
            },
        );
        if let Some(peer_id) = peer {
            if let Some(peer_rec) = reg.nodes.get_mut(&peer_id) {
                peer_rec.replica_peer = Some(id);
            }
        }
        id
    }

    /// Upserts a [`UserRecord`] (§4.2 Register user).
    pub fn register_user(&self, identity: &str, address: &str) {
        let mut reg = self.lock();
        reg.users
            .entry(identity.to_owned())
            .and_modify(|u| u.address = address.to_owned())
            .or_insert_with(|| UserRecord {
                identity: identity.to_owned(),
                address: address.to_owned(),
                registered: now_secs(),
            });
    }

    /// §4.2 View: every filename with its owner and cached counts.
    pub fn view(&self) -> Vec<FileRecord> {
        let reg = self.lock();
        let mut files: Vec<_> = reg.files.values().cloned().collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        files
    }

    /// §4.2 List: every registered user.
    pub fn list_users(&self) -> Vec<UserRecord> {
        let reg = self.lock();
        let mut users: Vec<_> = reg.users.values().cloned().collect();
        users.sort_by(|a, b| a.identity.cmp(&b.identity));
        users
    }

    /// §4.2/§4.3 Create: fails if the filename exists; otherwise places the file
    /// on the least-loaded connected Storage Node and records it.
    pub fn create_file(&self, filename: &str, owner: &str) -> Result<StorageNodeRecord, Error> {
        let mut reg = self.lock();
        if reg.files.contains_key(filename) {
            return Err(Error::FileExists);
        }

        let home = reg
            .nodes
            .values()
            .filter(|n| n.connected)
            .min_by_key(|n| n.file_count)
            .cloned()
            .ok_or(Error::NoStorageServers)?;

        let now = now_secs();
        reg.files.insert(
            filename.to_owned(),
            FileRecord {
                filename: filename.to_owned(),
                owner: owner.to_owned(),
                home_ss_id: home.id,
                created: now,
                modified: now,
                accessed: now,
                last_accessed_by: owner.to_owned(),
                word_count: 0,
                char_count: 0,
            },
        );
        if let Some(node) = reg.nodes.get_mut(&home.id) {
            node.file_count += 1;
        }
        drop(reg);
        self.cache.remove(filename);
        Ok(home)
    }

    /// §4.7 Copy: registers `dst` on `src`'s home node so it becomes resolvable
    /// through the normal two-hop protocol once the Storage Node clones the
    /// content. Fails if `dst` already exists (enforced here, globally, rather
    /// than only against the one Storage Node that happens to hold `src`).
    pub fn copy_file(&self, src: &str, dst: &str, owner: &str) -> Result<StorageNodeRecord, Error> {
        let mut reg = self.lock();
        if reg.files.contains_key(dst) {
            return Err(Error::FileExists);
        }
        let src_record = reg.files.get(src).cloned().ok_or(Error::FileNotFound)?;
        let home = reg.nodes.get(&src_record.home_ss_id).cloned().ok_or(Error::StorageServerDown)?;

        let now = now_secs();
        reg.files.insert(
            dst.to_owned(),
            FileRecord {
                filename: dst.to_owned(),
                owner: owner.to_owned(),
                home_ss_id: home.id,
                created: now,
                modified: now,
                accessed: now,
                last_accessed_by: owner.to_owned(),
                word_count: src_record.word_count,
                char_count: src_record.char_count,
            },
        );
        if let Some(node) = reg.nodes.get_mut(&home.id) {
            node.file_count += 1;
        }
        drop(reg);
        self.cache.remove(dst);
        Ok(home)
    }

    /// Resolves a filename to its home Storage Node for a content-bearing
    /// operation (§4.2 Read/Info/Stream/Copy/Write/... family). Consults the LRU
    /// cache first (§4.10); on a miss, falls back to the authoritative registry and
    /// refills the cache.
    pub fn resolve(&self, filename: &str) -> Result<StorageNodeRecord, Error> {
        if let Some(record) = self.cache.get(filename) {
            return self.home_node(&record);
        }

        let reg = self.lock();
        let record = reg.files.get(filename).cloned().ok_or(Error::FileNotFound)?;
        let home = reg.nodes.get(&record.home_ss_id).cloned().ok_or(Error::StorageServerDown)?;
        drop(reg);
        self.cache.put(filename.to_owned(), record);
        if !home.connected {
            return Err(Error::StorageServerDown);
        }
        Ok(home)
    }

    fn home_node(&self, record: &FileRecord) -> Result<StorageNodeRecord, Error> {
        let reg = self.lock();
        let home = reg.nodes.get(&record.home_ss_id).cloned().ok_or(Error::StorageServerDown)?;
        if !home.connected {
            return Err(Error::StorageServerDown);
        }
        Ok(home)
    }

    /// Move (§6 "single-level folder commands"): renames a namespace entry,
    /// requiring ownership; fails if `dst` already exists. Returns the home node
    /// so the caller can also rename the content at the Storage Node.
    pub fn rename_file(&self, src: &str, dst: &str, requester: &str) -> Result<StorageNodeRecord, Error> {
        let mut reg = self.lock();
        if reg.files.contains_key(dst) {
            return Err(Error::FileExists);
        }
        let mut record = reg.files.get(src).cloned().ok_or(Error::FileNotFound)?;
        if record.owner != requester {
            return Err(Error::Unauthorized);
        }
        let home = reg.nodes.get(&record.home_ss_id).cloned().ok_or(Error::StorageServerDown)?;
        reg.files.remove(src);
        record.filename = dst.to_owned();
        reg.files.insert(dst.to_owned(), record);
        drop(reg);
        self.cache.remove(src);
        self.cache.remove(dst);
        Ok(home)
    }

    /// ViewFolder: every FileRecord whose filename starts with `prefix`.
    pub fn view_folder(&self, prefix: &str) -> Vec<FileRecord> {
        let reg = self.lock();
        let mut records: Vec<_> = reg.files.values().filter(|f| f.filename.starts_with(prefix)).cloned().collect();
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        records
    }

    /// §4.2 Delete: only the owner may delete; removes the namespace entry and
    /// evicts the cache (the client is responsible for instructing the SN itself).
    pub fn delete_file(&self, filename: &str, requester: &str) -> Result<(), Error> {
        let mut reg = self.lock();
        let record = reg.files.get(filename).ok_or(Error::FileNotFound)?;
        if record.owner != requester {
            return Err(Error::Unauthorized);
        }
        let home_id = record.home_ss_id;
        reg.files.remove(filename);
        if let Some(node) = reg.nodes.get_mut(&home_id) {
            node.file_count = node.file_count.saturating_sub(1);
        }
        drop(reg);
        self.cache.remove(filename);
        Ok(())
    }

    /// Records that `identity` touched `filename`, refreshing `accessed`/cached
    /// counts after a Storage Node operation reports new stats back to the NN.
    pub fn touch(&self, filename: &str, identity: &str, word_count: u64, char_count: u64) {
        let mut reg = self.lock();
        if let Some(record) = reg.files.get_mut(filename) {
            record.accessed = now_secs();
            record.modified = now_secs();
            record.last_accessed_by = identity.to_owned();
            record.word_count = word_count;
            record.char_count = char_count;
        }
        drop(reg);
        self.cache.remove(filename);
    }

    /// Every connected node (used by the failure scan and by tests).
    pub fn nodes_snapshot(&self) -> Vec<StorageNodeRecord> {
        self.lock().nodes.values().cloned().collect()
    }

    /// Updates the heartbeat timestamp for a registered node (§4.5).
    pub fn record_heartbeat(&self, node_id: u64) -> bool {
        let mut reg = self.lock();
        match reg.nodes.get_mut(&node_id) {
            Some(node) => {
                node.last_heartbeat = now_secs();
                node.connected = true;
                true
            }
            None => false,
        }
    }

    /// Marks nodes whose heartbeat is older than `threshold_secs` as disconnected,
    /// returning the ids that changed state (§4.5). Never logs while the mutex is held.
    pub fn scan_for_failures(&self, threshold_secs: u64) -> Vec<(u64, Option<u64>)> {
        let now = now_secs();
        let mut reg = self.lock();
        let mut newly_failed = Vec::new();
        for node in reg.nodes.values_mut() {
            if node.connected && now.saturating_sub(node.last_heartbeat) > threshold_secs {
                node.connected = false;
                newly_failed.push((node.id, node.replica_peer));
            }
        }
        newly_failed
    }

    // --- Sentence lock manager (§4.4) ---

    /// `Acquire(user, file, idx)`.
    pub fn lock_acquire(&self, filename: &str, idx: u32, user: &str) -> Result<StorageNodeRecord, Error> {
        let mut reg = self.lock();
        let record = reg.files.get(filename).cloned().ok_or(Error::FileNotFound)?;
        let key = (filename.to_owned(), idx);
        match reg.locks.get(&key) {
            Some(existing) if existing.holder == user => {}
            Some(_) => return Err(Error::FileLocked),
            None => {
                reg.locks.insert(key, SentenceLock { holder: user.to_owned(), acquired: now_secs() });
            }
        }
        let home = reg.nodes.get(&record.home_ss_id).cloned().ok_or(Error::StorageServerDown)?;
        Ok(home)
    }

    /// `Release(user, file, idx)`.
    pub fn lock_release(&self, filename: &str, idx: u32, user: &str) -> Result<(), Error> {
        let mut reg = self.lock();
        let key = (filename.to_owned(), idx);
        match reg.locks.get(&key) {
            None => Err(Error::InvalidParameters),
            Some(lock) if lock.holder != user => Err(Error::Unauthorized),
            Some(_) => {
                reg.locks.remove(&key);
                Ok(())
            }
        }
    }

    /// Current holder of a sentence lock, if any (used by tests and diagnostics).
    pub fn lock_holder(&self, filename: &str, idx: u32) -> Option<String> {
        self.lock().locks.get(&(filename.to_owned(), idx)).map(|l| l.holder.clone())
    }

    // --- Access-request workflow (§4.6) ---

    /// `RequestAccess(file)`.
    pub fn request_access(&self, filename: &str, requester: &str) -> Result<(), Error> {
        let mut reg = self.lock();
        let record = reg.files.get(filename).ok_or(Error::FileNotFound)?;
        let owner = record.owner.clone();
        reg.access_requests.insert(
            (filename.to_owned(), requester.to_owned()),
            AccessRequest {
                filename: filename.to_owned(),
                requester: requester.to_owned(),
                owner,
                requested: now_secs(),
                pending: true,
            },
        );
        Ok(())
    }

    /// `ViewRequests`: every pending request whose owner is the caller.
    pub fn view_requests(&self, owner: &str) -> Vec<AccessRequest> {
        self.lock()
            .access_requests
            .values()
            .filter(|r| r.pending && r.owner == owner)
            .cloned()
            .collect()
    }

    /// Marks an access request non-pending, checking that `caller` owns the file.
    /// Returns the request so the caller can drive the SN-side ACL update.
    fn resolve_request(
        &self,
        filename: &str,
        requester: &str,
        caller: &str,
    ) -> Result<AccessRequest, Error> {
        let mut reg = self.lock();
        let key = (filename.to_owned(), requester.to_owned());
        let request = reg.access_requests.get(&key).cloned().ok_or(Error::InvalidParameters)?;
        if request.owner != caller {
            return Err(Error::Unauthorized);
        }
        if !request.pending {
            return Err(Error::InvalidParameters);
        }
        reg.access_requests.get_mut(&key).unwrap().pending = false;
        Ok(request)
    }

    /// `ApproveRequest(file, requester)`: returns the home node so the caller can
    /// push the ACL update to it.
    pub fn approve_request(
        &self,
        filename: &str,
        requester: &str,
        caller: &str,
    ) -> Result<StorageNodeRecord, Error> {
        let request = self.resolve_request(filename, requester, caller)?;
        let reg = self.lock();
        let record = reg.files.get(&request.filename).cloned().ok_or(Error::FileNotFound)?;
        reg.nodes.get(&record.home_ss_id).cloned().ok_or(Error::StorageServerDown)
    }

    /// `DenyRequest(file, requester)`: no ACL effect.
    pub fn deny_request(&self, filename: &str, requester: &str, caller: &str) -> Result<(), Error> {
        self.resolve_request(filename, requester, caller)?;
        Ok(())
    }
}
