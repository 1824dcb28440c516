//! In-memory implementation of ItemStore

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::item::Item;
use crate::store::{ItemStore, StoreError};

/// In-memory implementation of ItemStore
///
/// Used by tests and as the fallback backend when no database is
/// configured. Ids are handed out from a monotonically increasing sequence
/// starting at 1 and are never reused, matching a `BIGSERIAL` column.
///
/// # Example
///
/// ```
/// use items_core::InMemoryItemStore;
///
/// let store = InMemoryItemStore::new();
/// assert!(store.is_empty());
/// ```
pub struct InMemoryItemStore {
    items: RwLock<BTreeMap<i64, Item>>,
    sequence: AtomicI64,
}

impl InMemoryItemStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            sequence: AtomicI64::new(0),
        }
    }

    /// Get the number of stored items
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.items.write().clear();
    }
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.items.read().values().cloned().collect())
    }

    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().get(&id).cloned())
    }

    async fn save_item(&self, item: Item) -> Result<Item, StoreError> {
        let mut items = self.items.write();

        match item.id {
            Some(id) => {
                let stored = items.get_mut(&id).ok_or(StoreError::ItemNotFound(id))?;
                *stored = item.clone();
                debug!(id, "updated item");
                Ok(item)
            }
            None => {
                let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                let item = item.with_id(id);
                items.insert(id, item.clone());
                debug!(id, "inserted item");
                Ok(item)
            }
        }
    }

    async fn set_status(&self, id: i64, status: &str) -> Result<Option<Item>, StoreError> {
        let mut items = self.items.write();
        Ok(items.get_mut(&id).map(|item| {
            item.status = status.to_string();
            item.clone()
        }))
    }

    async fn delete_item(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.items.write().remove(&id).is_some())
    }

    async fn list_item_ids(&self) -> Result<Vec<i64>, StoreError> {
        Ok(self.items.read().keys().copied().collect())
    }
}
