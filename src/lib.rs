//! lockstash: a single-file persistence store with cross-process advisory
//! locking, optional OS-level file hiding, and optional symmetric encryption.
//!
//! The store sits between a data-binding framework and the disk: the
//! framework calls a mutation hook (`record_created`, `collection_cleared`,
//! ...) with the fully re-serialized dataset, and the store runs the
//! surrounding protocol — presave contention check, lock acquisition, the
//! whole-file write, lock release, and completion notifications.
//!
//! Exclusion between processes is advisory: a `<file>.lock` marker created
//! with exclusive-create semantics, refreshed while held and reclaimable
//! after a staleness timeout if its owner dies. Locking optionally hides the
//! target file and revokes write permission as OS-level hardening.
//!
//! ```no_run
//! use lockstash::{Store, StoreConfig};
//!
//! let config = StoreConfig::new("db.txt").with_encryption_key("secret");
//! let mut store = Store::new(config)?;
//!
//! store.record_created(r#"[{"a":1}]"#)?;
//! let dataset = store.fetch()?;
//! # Ok::<(), lockstash::StashError>(())
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod lock;
pub mod os;
pub mod store;

pub use config::StoreConfig;
pub use crypto::{Cipher, CipherKind};
pub use error::{Result, StashError};
pub use events::Notification;
pub use lock::{LockHandle, LockManager, LockMarker};
pub use os::OsCapability;
pub use store::Store;
