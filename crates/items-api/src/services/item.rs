// Item service for business logic

use items_core::{
    BatchOutcome, BatchProcessor, Item, ItemInput, ItemStore, ProcessError, StoreError,
    ValidationError,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub struct ItemService {
    store: Arc<dyn ItemStore>,
    processor: Arc<BatchProcessor>,
}

impl ItemService {
    pub fn new(store: Arc<dyn ItemStore>, processor: Arc<BatchProcessor>) -> Self {
        Self { store, processor }
    }

    pub async fn list(&self) -> Result<Vec<Item>, ServiceError> {
        Ok(self.store.list_items().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Item>, ServiceError> {
        Ok(self.store.find_item(id).await?)
    }

    /// Validate and insert; the store assigns the id
    pub async fn create(&self, input: ItemInput) -> Result<Item, ServiceError> {
        let item = input.validate()?;
        Ok(self.store.save_item(item).await?)
    }

    /// Validate and replace an existing item. `None` if the id is unknown.
    pub async fn update(&self, id: i64, input: ItemInput) -> Result<Option<Item>, ServiceError> {
        let item = input.validate()?.with_id(id);

        if self.store.find_item(id).await?.is_none() {
            return Ok(None);
        }

        match self.store.save_item(item).await {
            Ok(saved) => Ok(Some(saved)),
            Err(StoreError::ItemNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.store.delete_item(id).await?)
    }

    /// Mark every stored item as processed
    pub async fn process(&self) -> Result<BatchOutcome, ServiceError> {
        Ok(self.processor.process_all().await?)
    }
}
