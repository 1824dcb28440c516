// Services layer for business logic
// Services own validation and call the store and processor directly

pub mod item;

pub use item::{ItemService, ServiceError};
