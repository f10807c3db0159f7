//! Locking subsystem for lockstash.
//!
//! Mutual exclusion between processes writing the same target file rests on
//! an advisory lock marker: a sibling file named `<target>.lock`, created
//! with **create_new** semantics (exclusive create) so that only one process
//! can claim it at a time.
//!
//! # Marker Metadata
//!
//! Each marker contains JSON metadata:
//! - `owner`: who holds the lock (`user@HOST`)
//! - `pid`: the process ID
//! - `created_at`: RFC3339 timestamp of acquisition
//! - `touched_at`: RFC3339 timestamp of the last keepalive refresh
//!
//! A marker whose `touched_at` is older than the staleness timeout is
//! treated as abandoned and reclaimable.
//!
//! # Ownership
//!
//! Acquiring the lock yields a [`LockHandle`], the owned release capability.
//! A process never treats itself as owner unless it holds a handle it
//! created; releasing consumes the handle. Unlocking a lock this process
//! does not own is a warning-level no-op.

mod handle;
mod manager;
mod marker;


pub use handle::LockHandle;
pub use manager::LockManager;
pub use marker::LockMarker;
