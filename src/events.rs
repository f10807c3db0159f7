//! Notifications emitted by the store.
//!
//! The hosting data-binding framework observes these to learn when locks
//! move, when a save lands, and which mutation intent triggered it. The
//! store exposes plain callback subscription instead of the original
//! global-registry plugin pattern; see [`Store::subscribe`](crate::Store::subscribe).

use serde::{Deserialize, Serialize};

/// A notification emitted by the store, observable by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// This process acquired the advisory lock.
    LockAcquired,
    /// This process released the advisory lock.
    LockReleased,
    /// A save completed and the file holds the new content.
    SaveComplete,
    /// A fetch completed, carrying the fetched content (None if no prior
    /// data exists).
    FetchComplete(Option<String>),
    /// A record was created and the dataset was persisted.
    RecordCreated,
    /// A record was updated and the dataset was persisted.
    RecordUpdated,
    /// A record was deleted and the dataset was persisted.
    RecordDeleted,
    /// A collection was created and the dataset was persisted.
    CollectionCreated,
    /// A collection was updated and the dataset was persisted.
    CollectionUpdated,
    /// A collection was deleted and the dataset was persisted.
    CollectionDeleted,
    /// A collection was cleared and the dataset was persisted.
    CollectionCleared,
}

impl Notification {
    /// The notification's wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::LockAcquired => "lock_acquired",
            Notification::LockReleased => "lock_released",
            Notification::SaveComplete => "save_complete",
            Notification::FetchComplete(_) => "fetch_complete",
            Notification::RecordCreated => "record_created",
            Notification::RecordUpdated => "record_updated",
            Notification::RecordDeleted => "record_deleted",
            Notification::CollectionCreated => "collection_created",
            Notification::CollectionUpdated => "collection_updated",
            Notification::CollectionDeleted => "collection_deleted",
            Notification::CollectionCleared => "collection_cleared",
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback invoked for every notification the store emits.
pub type Subscriber = Box<dyn Fn(&Notification)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_names_are_snake_case() {
        assert_eq!(Notification::LockAcquired.to_string(), "lock_acquired");
        assert_eq!(Notification::SaveComplete.to_string(), "save_complete");
        assert_eq!(
            Notification::FetchComplete(None).to_string(),
            "fetch_complete"
        );
        assert_eq!(
            Notification::CollectionCleared.to_string(),
            "collection_cleared"
        );
    }

    #[test]
    fn fetch_complete_carries_content() {
        let n = Notification::FetchComplete(Some("data".to_string()));
        match n {
            Notification::FetchComplete(Some(content)) => assert_eq!(content, "data"),
            other => panic!("unexpected notification: {}", other),
        }
    }

    #[test]
    fn notification_serializes_to_snake_case_json() {
        let json = serde_json::to_string(&Notification::RecordCreated).unwrap();
        assert_eq!(json, "\"record_created\"");

        let json = serde_json::to_string(&Notification::FetchComplete(None)).unwrap();
        assert!(json.contains("fetch_complete"));
    }
}
