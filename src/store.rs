//! The persistence lifecycle controller.
//!
//! `Store` orchestrates the save/fetch protocol around a single target file:
//! presave contention check, optional automatic locking, encrypt-on-write /
//! decrypt-on-read, and completion notifications back to the hosting
//! framework. Serializing the in-memory dataset into the `content` strings
//! passed here is the collaborator's job; every mutation hook persists the
//! full dataset with a whole-file overwrite, no diffing.

use crate::config::StoreConfig;
use crate::crypto::Cipher;
use crate::error::{Result, StashError};
use crate::events::{Notification, Subscriber};
use crate::lock::LockManager;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// A locking, optionally encrypting, single-file persistence store.
pub struct Store {
    config: StoreConfig,
    cipher: Option<Cipher>,
    lock: LockManager,
    subscribers: Vec<Subscriber>,
}

impl Store {
    /// Create a store from a configuration (or a bare path, via the
    /// `Into<StoreConfig>` shorthand).
    ///
    /// The target path is resolved to an absolute path once, here. A
    /// missing/empty file path is a fatal configuration error.
    pub fn new(config: impl Into<StoreConfig>) -> Result<Self> {
        let config = config.into();
        config.validate()?;

        let file = absolutize(&config.file)?;
        let cipher = config
            .encryption_key
            .as_deref()
            .map(|key| Cipher::new(config.cipher, key));
        let lock = LockManager::new(
            file,
            config.stale_timeout(),
            config.refresh_interval(),
            config.hide_locked_file,
        );

        Ok(Self {
            config,
            cipher,
            lock,
            subscribers: Vec::new(),
        })
    }

    /// Register a callback invoked for every notification this store emits.
    pub fn subscribe(&mut self, subscriber: impl Fn(&Notification) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Current effective path of the target file. Differs from the
    /// configured path only while the file is hidden by rename.
    pub fn file_path(&self) -> &Path {
        self.lock.target()
    }

    /// Whether automatic locking around writes is enabled.
    pub fn autolock(&self) -> bool {
        self.config.autolock
    }

    /// Enable or disable automatic locking around writes.
    pub fn set_autolock(&mut self, autolock: bool) {
        self.config.autolock = autolock;
    }

    /// Whether an advisory lock currently exists for the target file.
    pub fn locked(&self) -> bool {
        self.lock.locked()
    }

    /// Whether this store instance holds the current lock.
    pub fn is_lock_owner(&self) -> bool {
        self.lock.is_lock_owner()
    }

    /// Acquire the advisory lock. Idempotent; emits `lock_acquired` when
    /// this call takes ownership.
    pub fn lock(&mut self) -> Result<()> {
        if self.lock.lock()? {
            self.emit(&Notification::LockAcquired);
        }
        Ok(())
    }

    /// Release the advisory lock. A no-op without a lock, a warning-level
    /// no-op for a lock held elsewhere; emits `lock_released` when this call
    /// released it.
    pub fn unlock(&mut self) -> Result<()> {
        if self.lock.unlock()? {
            self.emit(&Notification::LockReleased);
        }
        Ok(())
    }

    /// Encrypt content with the configured cipher; passthrough when no key
    /// is configured.
    pub fn encrypt(&self, plaintext: &str) -> String {
        match &self.cipher {
            Some(cipher) => cipher.encrypt(plaintext),
            None => plaintext.to_string(),
        }
    }

    /// Decrypt content with the configured cipher.
    ///
    /// Requesting decryption without a configured key is fatal.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        match &self.cipher {
            Some(cipher) => cipher.decrypt(ciphertext),
            None => Err(StashError::MissingKey(
                self.lock.target().display().to_string(),
            )),
        }
    }

    /// Write `content` to the target file, overwriting it entirely.
    ///
    /// With autolock enabled: acquires the lock first when the file is not
    /// already locked, and releases it after the write when this instance
    /// holds it. Encrypts when `encrypt` is set and a key is configured.
    /// The parent directory is created if missing. The write itself is a
    /// plain full-content replace; crash atomicity is out of scope.
    pub fn write_to_disk(&mut self, content: &str, encrypt: bool) -> Result<()> {
        if self.config.autolock && !self.lock.locked() {
            self.lock()?;
        }

        let payload = if encrypt {
            self.encrypt(content)
        } else {
            content.to_string()
        };

        self.ensure_parent_dir()?;
        self.lock.refresh();

        // Write denial targets other processes; lift it for our own write.
        self.lock.allow_owner_write()?;
        let target = self.lock.target();
        let written = fs::write(target, payload.as_bytes()).map_err(|e| {
            StashError::Io(format!("failed to write '{}': {}", target.display(), e))
        });
        self.lock.deny_other_writes()?;
        written?;
        debug!(
            "wrote {} bytes to '{}'",
            payload.len(),
            self.lock.target().display()
        );

        if self.config.autolock && self.lock.is_lock_owner() {
            self.unlock()?;
        }

        Ok(())
    }

    /// Read the full target file content.
    ///
    /// Returns `Ok(None)` when the file does not exist or is not readable —
    /// that is "no prior data", not an error. With `decrypt` set, the
    /// configured cipher is applied; requesting decryption without a key is
    /// fatal. Every call re-reads from the filesystem.
    pub fn read_from_disk(&self, decrypt: bool) -> Result<Option<String>> {
        let target = self.lock.target();
        let raw = match fs::read_to_string(target) {
            Ok(raw) => raw,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                return Ok(None);
            }
            Err(e) => {
                return Err(StashError::Io(format!(
                    "failed to read '{}': {}",
                    target.display(),
                    e
                )));
            }
        };

        if decrypt {
            return self.decrypt(&raw).map(Some);
        }
        Ok(Some(raw))
    }

    /// Persist `content` and emit `save_complete`.
    ///
    /// Fails fatally before any write when the file is locked by a
    /// different owner.
    pub fn save(&mut self, content: &str) -> Result<()> {
        self.presave_check()?;
        self.write_to_disk(content, true)?;
        self.emit(&Notification::SaveComplete);
        Ok(())
    }

    /// [`save`](Self::save), then invoke `callback` after `save_complete`
    /// has been emitted.
    pub fn save_with(&mut self, content: &str, callback: impl FnOnce()) -> Result<()> {
        self.save(content)?;
        callback();
        Ok(())
    }

    /// Read the stored content and emit `fetch_complete` carrying it.
    ///
    /// Decryption is applied when a key is configured. Reads take no lock.
    pub fn fetch(&mut self) -> Result<Option<String>> {
        let content = self.read_from_disk(self.cipher.is_some())?;
        self.emit(&Notification::FetchComplete(content.clone()));
        Ok(content)
    }

    /// A record was created: persist the re-serialized dataset.
    pub fn record_created(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::RecordCreated)
    }

    /// A record was updated: persist the re-serialized dataset.
    pub fn record_updated(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::RecordUpdated)
    }

    /// A record was deleted: persist the re-serialized dataset.
    pub fn record_deleted(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::RecordDeleted)
    }

    /// A collection was created: persist the re-serialized dataset.
    pub fn collection_created(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::CollectionCreated)
    }

    /// A collection was updated: persist the re-serialized dataset.
    pub fn collection_updated(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::CollectionUpdated)
    }

    /// A collection was deleted: persist the re-serialized dataset.
    pub fn collection_deleted(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::CollectionDeleted)
    }

    /// A collection was cleared: persist the re-serialized dataset.
    pub fn collection_cleared(&mut self, content: &str) -> Result<()> {
        self.save_and_notify(content, Notification::CollectionCleared)
    }

    /// The shared path behind every mutation hook: save, then emit the
    /// intent notification ahead of `save_complete`.
    fn save_and_notify(&mut self, content: &str, intent: Notification) -> Result<()> {
        self.presave_check()?;
        self.write_to_disk(content, true)?;
        self.emit(&intent);
        self.emit(&Notification::SaveComplete);
        Ok(())
    }

    /// Abort before any write when the file is locked by a different owner;
    /// on success make sure the target directory tree exists.
    fn presave_check(&self) -> Result<()> {
        if self.lock.locked() && !self.lock.is_lock_owner() {
            let holder = self
                .lock
                .holder()
                .map(|m| format!("{} (pid {})", m.owner, m.pid))
                .unwrap_or_else(|| "another process".to_string());
            return Err(StashError::Contention(format!(
                "'{}' is locked by {}",
                self.lock.target().display(),
                holder
            )));
        }
        self.ensure_parent_dir()
    }

    /// Idempotent recursive creation of the target file's parent directory.
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.lock.target().parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                StashError::Io(format!(
                    "failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    fn emit(&self, notification: &Notification) {
        debug!("notify: {}", notification);
        for subscriber in &self.subscribers {
            subscriber(notification);
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("file", &self.lock.target())
            .field("encrypted", &self.cipher.is_some())
            .field("autolock", &self.config.autolock)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Resolve a path to an absolute one without requiring it to exist.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| StashError::Io(format!("failed to resolve working directory: {}", e)))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn plain_config(dir: &TempDir) -> StoreConfig {
        StoreConfig::new(dir.path().join("db.txt")).with_hide_locked_file(false)
    }

    /// Collects emitted notification names for assertions.
    fn record_notifications(store: &mut Store) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |n| sink.borrow_mut().push(n.name().to_string()));
        seen
    }

    #[test]
    fn missing_file_path_is_a_config_error() {
        let err = Store::new(StoreConfig::default()).unwrap_err();
        assert!(matches!(err, StashError::Config(_)));
    }

    #[test]
    fn save_then_fetch_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(plain_config(&temp_dir)).unwrap();

        store.save(r#"{"a":1}"#).unwrap();
        let fetched = store.fetch().unwrap();
        assert_eq!(fetched.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn encrypted_save_round_trips_and_hides_plaintext() {
        let temp_dir = TempDir::new().unwrap();
        let config = plain_config(&temp_dir).with_encryption_key("k");
        let mut store = Store::new(config).unwrap();

        store.save(r#"{"a":1}"#).unwrap();

        let fetched = store.read_from_disk(true).unwrap();
        assert_eq!(fetched.as_deref(), Some(r#"{"a":1}"#));

        // Raw bytes on disk must not contain the plaintext
        let raw = fs::read_to_string(temp_dir.path().join("db.txt")).unwrap();
        assert!(!raw.contains(r#""a":1"#));
    }

    #[test]
    fn fetch_of_missing_file_is_none_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(plain_config(&temp_dir)).unwrap();

        let seen = record_notifications(&mut store);
        assert_eq!(store.fetch().unwrap(), None);
        assert_eq!(seen.borrow().as_slice(), ["fetch_complete"]);
    }

    #[test]
    fn decrypt_without_key_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(plain_config(&temp_dir)).unwrap();
        store.save("plain content").unwrap();

        let err = store.read_from_disk(true).unwrap_err();
        assert!(matches!(err, StashError::MissingKey(_)));
    }

    #[test]
    fn write_and_read_without_encryption_flags() {
        let temp_dir = TempDir::new().unwrap();
        let config = plain_config(&temp_dir).with_encryption_key("k");
        let mut store = Store::new(config).unwrap();

        // Explicitly skip encryption despite the configured key
        store.write_to_disk("raw content", false).unwrap();
        let read = store.read_from_disk(false).unwrap();
        assert_eq!(read.as_deref(), Some("raw content"));
    }

    #[test]
    fn autolock_save_locks_and_releases_around_the_write() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(plain_config(&temp_dir)).unwrap();

        let seen = record_notifications(&mut store);
        store.save("content").unwrap();

        // Lock cycled around the write, then the save completed
        assert_eq!(
            seen.borrow().as_slice(),
            ["lock_acquired", "lock_released", "save_complete"]
        );
        assert!(!store.locked());
        assert!(!store.is_lock_owner());
    }

    #[test]
    fn autolock_disabled_store_never_locks() {
        let temp_dir = TempDir::new().unwrap();
        let config = plain_config(&temp_dir).with_autolock(false);
        let mut store = Store::new(config).unwrap();

        assert!(!store.locked());
        assert!(!store.is_lock_owner());

        // Presave passes and the write happens without a lock
        let seen = record_notifications(&mut store);
        store.save("content").unwrap();
        assert_eq!(seen.borrow().as_slice(), ["save_complete"]);
        assert!(!store.locked());
    }

    #[test]
    fn autolock_releases_a_manually_acquired_lock_after_write() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(plain_config(&temp_dir)).unwrap();

        store.lock().unwrap();
        assert!(store.is_lock_owner());

        store.save("content").unwrap();
        assert!(!store.locked());
        assert!(!store.is_lock_owner());
    }

    #[test]
    fn manual_locking_with_autolock_disabled_keeps_the_lock() {
        let temp_dir = TempDir::new().unwrap();
        let config = plain_config(&temp_dir).with_autolock(false);
        let mut store = Store::new(config).unwrap();

        store.lock().unwrap();
        store.save("content").unwrap();
        assert!(store.is_lock_owner());

        store.unlock().unwrap();
        assert!(!store.locked());
    }

    #[test]
    fn save_while_locked_by_another_owner_aborts_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let mut first = Store::new(plain_config(&temp_dir)).unwrap();
        let mut second = Store::new(plain_config(&temp_dir)).unwrap();

        first.save("original").unwrap();
        first.lock().unwrap();

        let err = second.save("overwrite attempt").unwrap_err();
        assert!(matches!(err, StashError::Contention(_)));

        // Prior content is untouched
        let raw = fs::read_to_string(temp_dir.path().join("db.txt")).unwrap();
        assert_eq!(raw, "original");

        first.unlock().unwrap();
        second.save("overwrite attempt").unwrap();
    }

    #[test]
    fn two_instances_contend_via_the_shared_marker() {
        let temp_dir = TempDir::new().unwrap();
        let mut first = Store::new(plain_config(&temp_dir)).unwrap();
        let second = Store::new(plain_config(&temp_dir)).unwrap();

        first.lock().unwrap();
        assert!(first.is_lock_owner());
        assert!(second.locked());
        assert!(!second.is_lock_owner());
    }

    #[test]
    fn mutation_hooks_emit_intent_then_save_complete() {
        let temp_dir = TempDir::new().unwrap();
        let config = plain_config(&temp_dir).with_autolock(false);
        let mut store = Store::new(config).unwrap();
        let seen = record_notifications(&mut store);

        store.record_created("v1").unwrap();
        store.record_updated("v2").unwrap();
        store.record_deleted("v3").unwrap();
        store.collection_created("v4").unwrap();
        store.collection_updated("v5").unwrap();
        store.collection_deleted("v6").unwrap();
        store.collection_cleared("[]").unwrap();

        assert_eq!(
            seen.borrow().as_slice(),
            [
                "record_created",
                "save_complete",
                "record_updated",
                "save_complete",
                "record_deleted",
                "save_complete",
                "collection_created",
                "save_complete",
                "collection_updated",
                "save_complete",
                "collection_deleted",
                "save_complete",
                "collection_cleared",
                "save_complete",
            ]
        );

        // Every hook overwrote the whole file
        let raw = fs::read_to_string(temp_dir.path().join("db.txt")).unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn save_with_invokes_the_callback_after_completion() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(plain_config(&temp_dir)).unwrap();

        let called = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&called);
        store.save_with("content", move || *flag.borrow_mut() = true).unwrap();
        assert!(*called.borrow());
    }

    #[test]
    fn fetch_complete_carries_the_content() {
        let temp_dir = TempDir::new().unwrap();
        let config = plain_config(&temp_dir).with_encryption_key("secret");
        let mut store = Store::new(config).unwrap();
        store.save("payload").unwrap();

        let carried = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&carried);
        store.subscribe(move |n| {
            if let Notification::FetchComplete(content) = n {
                *sink.borrow_mut() = content.clone();
            }
        });

        let fetched = store.fetch().unwrap();
        assert_eq!(fetched.as_deref(), Some("payload"));
        assert_eq!(carried.borrow().as_deref(), Some("payload"));
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b").join("db.txt");
        let config = StoreConfig::new(&nested).with_hide_locked_file(false);
        let mut store = Store::new(config).unwrap();

        store.save("content").unwrap();
        assert_eq!(fs::read_to_string(&nested).unwrap(), "content");
    }

    #[test]
    fn relative_paths_are_resolved_at_construction() {
        let store = Store::new("some-relative.txt").unwrap();
        assert!(store.file_path().is_absolute());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn hidden_store_round_trips_through_the_rename() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.txt");
        let mut store = Store::new(StoreConfig::new(&path)).unwrap();

        // Autolock + hide: the write happens against the dot-prefixed path,
        // then unlock restores the canonical name.
        store.save("content").unwrap();
        assert_eq!(store.file_path(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "content");
        assert!(!temp_dir.path().join(".db.txt").exists());

        assert_eq!(store.fetch().unwrap().as_deref(), Some("content"));
    }
}
