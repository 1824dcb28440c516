// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use items_core::Item;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: Some(row.id),
            name: row.name,
            description: row.description,
            status: row.status,
            email: row.email,
        }
    }
}
