//! ItemStore trait definition

use async_trait::async_trait;

use crate::item::Item;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Update targeted an id the store does not hold
    #[error("item not found: {0}")]
    ItemNotFound(i64),

    /// Database error
    #[error("database error: {0}")]
    Database(String),
}

/// Thin persistence abstraction for items.
///
/// Implementations must be safe to call from many tasks at once: the batch
/// processor fetches and saves items concurrently.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All stored items, ordered by id
    async fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    /// Look up a single item
    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError>;

    /// Insert or update.
    ///
    /// An item without an id is inserted and receives a fresh id. An item
    /// with an id replaces the stored fields; an unknown id yields
    /// [`StoreError::ItemNotFound`].
    async fn save_item(&self, item: Item) -> Result<Item, StoreError>;

    /// Overwrite only the status of a stored item, leaving every other field
    /// as it currently is. `None` if the id is unknown.
    async fn set_status(&self, id: i64, status: &str) -> Result<Option<Item>, StoreError>;

    /// Delete by id, returning whether a row was removed
    async fn delete_item(&self, id: i64) -> Result<bool, StoreError>;

    /// All stored ids, ordered
    async fn list_item_ids(&self) -> Result<Vec<i64>, StoreError>;
}
