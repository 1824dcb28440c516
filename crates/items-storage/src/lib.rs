// Postgres storage layer with sqlx
//
// This crate provides the database implementation of items_core::ItemStore.

pub mod models;
pub mod repositories;

pub use models::*;
pub use repositories::*;
