// Repository layer for database operations

use anyhow::Result;
use async_trait::async_trait;
use items_core::{Item, ItemStore, StoreError};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

use crate::models::ItemRow;

const ITEM_COLUMNS: &str = "id, name, description, status, email, created_at, updated_at";

/// PostgreSQL item store
///
/// # Example
///
/// ```ignore
/// use items_storage::Database;
///
/// let db = Database::from_url("postgres://localhost/items").await?;
/// db.migrate().await?;
/// ```
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn db_error(op: &str, e: sqlx::Error) -> StoreError {
    error!("Failed to {}: {}", op, e);
    StoreError::Database(e.to_string())
}

#[async_trait]
impl ItemStore for Database {
    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list items", e))?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find item", e))?;

        Ok(row.map(Item::from))
    }

    #[instrument(skip(self, item), fields(id = ?item.id))]
    async fn save_item(&self, item: Item) -> Result<Item, StoreError> {
        let row = match item.id {
            None => sqlx::query_as::<_, ItemRow>(&format!(
                r#"
                INSERT INTO items (name, description, status, email)
                VALUES ($1, $2, $3, $4)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.status)
            .bind(&item.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("insert item", e))?,

            Some(id) => sqlx::query_as::<_, ItemRow>(&format!(
                r#"
                UPDATE items
                SET
                    name = $2,
                    description = $3,
                    status = $4,
                    email = $5,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.status)
            .bind(&item.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update item", e))?
            .ok_or(StoreError::ItemNotFound(id))?,
        };

        debug!(id = row.id, "saved item");
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: i64, status: &str) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("set item status", e))?;

        Ok(row.map(Item::from))
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete item", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_item_ids(&self) -> Result<Vec<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list item ids", e))
    }
}
