// Item CRUD and batch processing HTTP routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use items_core::{BatchProcessor, Item, ItemInput, ItemStore};
use std::sync::Arc;

use crate::common::ErrorResponse;
use crate::services::{ItemService, ServiceError};

/// App state for item routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ItemService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, processor: Arc<BatchProcessor>) -> Self {
        Self {
            service: Arc::new(ItemService::new(store, processor)),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Number of items whose task failed in a process run
pub const ITEMS_FAILED_HEADER: HeaderName = HeaderName::from_static("x-items-failed");

/// Create item routes
pub fn routes(state: AppState) -> Router {
    // The static segment wins over `{id}` for /items/process.
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/process", get(process_items))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .with_state(state)
}

fn error_response(action: &str, e: ServiceError) -> ApiError {
    match e {
        ServiceError::Validation(err) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: err.to_string(),
                details: err.violations,
            }),
        ),
        other => {
            tracing::error!("Failed to {}: {}", action, other);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::internal()))
        }
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(rejection.body_text())),
    )
}

/// GET /api/items - List all items
#[utoipa::path(
    get,
    path = "/api/items",
    responses(
        (status = 200, description = "List of items", body = Vec<Item>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .service
        .list()
        .await
        .map_err(|e| error_response("list items", e))?;

    Ok(Json(items))
}

/// GET /api/items/{id} - Get item by ID
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item found", body = Item),
        (status = 204, description = "No item with this ID"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Item>, StatusCode> {
    let item = state
        .service
        .get(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get item: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NO_CONTENT)?;

    Ok(Json(item))
}

/// POST /api/items - Create a new item
#[utoipa::path(
    post,
    path = "/api/items",
    request_body = ItemInput,
    responses(
        (status = 201, description = "Item created successfully", body = Item),
        (status = 400, description = "Invalid item", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<ItemInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let Json(input) = body.map_err(bad_body)?;

    let item = state
        .service
        .create(input)
        .await
        .map_err(|e| error_response("create item", e))?;

    tracing::debug!(id = ?item.id, "Created item");
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/items/{id} - Replace an item
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = ItemInput,
    responses(
        (status = 200, description = "Item updated successfully", body = Item),
        (status = 400, description = "Invalid item", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<ItemInput>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let Json(input) = body.map_err(bad_body)?;

    let item = state
        .service
        .update(id, input)
        .await
        .map_err(|e| error_response("update item", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Item {} not found", id))),
            )
        })?;

    Ok(Json(item))
}

/// DELETE /api/items/{id} - Delete an item
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted, or there was nothing to delete"),
        (status = 500, description = "Internal server error")
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let deleted = state.service.delete(id).await.map_err(|e| {
        tracing::error!("Failed to delete item: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !deleted {
        tracing::debug!(id, "Delete of unknown item ignored");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/items/process - Mark every item as PROCESSED
///
/// Responds once every item task has finished. Items whose task failed are
/// left out of the body; their count is sent in `X-Items-Failed`.
#[utoipa::path(
    get,
    path = "/api/items/process",
    responses(
        (status = 200, description = "Items transitioned to PROCESSED", body = Vec<Item>,
            headers(
                ("x-items-failed" = usize, description = "Items whose task failed in this run")
            )
        ),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn process_items(
    State(state): State<AppState>,
) -> Result<([(HeaderName, HeaderValue); 1], Json<Vec<Item>>), ApiError> {
    let outcome = state
        .service
        .process()
        .await
        .map_err(|e| error_response("process items", e))?;

    if !outcome.is_complete() {
        tracing::warn!(
            run_id = %outcome.run_id,
            failed = outcome.failed.len(),
            "Batch finished with failed items"
        );
    }

    let failed = HeaderValue::from(outcome.failed.len());
    Ok(([(ITEMS_FAILED_HEADER, failed)], Json(outcome.into_processed())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use items_core::{InMemoryItemStore, ItemStatus, ItemWork, NoopWork, WorkError, WorkerPool};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<InMemoryItemStore>) {
        test_app_with_work(Arc::new(NoopWork))
    }

    fn test_app_with_work(work: Arc<dyn ItemWork>) -> (Router, Arc<InMemoryItemStore>) {
        let store = Arc::new(InMemoryItemStore::new());
        let processor = Arc::new(BatchProcessor::new(
            store.clone(),
            WorkerPool::with_max_concurrency(4),
            work,
        ));
        let app = Router::new().nest("/api", routes(AppState::new(store.clone(), processor)));
        (app, store)
    }

    async fn seed(store: &InMemoryItemStore, name: &str) -> Item {
        store
            .save_item(Item::new(
                name,
                "Description",
                ItemStatus::NEW,
                "test@example.com",
            ))
            .await
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_items() {
        let (app, store) = test_app();
        seed(&store, "Item 4").await;
        seed(&store, "Item 5").await;

        let response = app.oneshot(empty_request("GET", "/api/items")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["name"], "Item 4");
    }

    #[tokio::test]
    async fn test_create_item_valid_input_returns_created() {
        let (app, store) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/items",
                json!({
                    "id": null,
                    "name": "Test Item",
                    "description": "Description",
                    "status": "NEW",
                    "email": "test@example.com"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "Test Item");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_item_invalid_input_returns_bad_request() {
        let (app, store) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/items",
                json!({
                    "id": null,
                    "name": null,
                    "description": null,
                    "status": null,
                    "email": "invalid-email"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "description", "status", "email"]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_item_malformed_email_leaves_store_unchanged() {
        let (app, store) = test_app();
        let existing = seed(&store, "Existing").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/items",
                json!({
                    "name": "Test Item",
                    "description": "Description",
                    "status": "NEW",
                    "email": "not-an-email"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.list_items().await.unwrap(), vec![existing]);
    }

    #[tokio::test]
    async fn test_create_item_wrong_field_type_returns_bad_request() {
        let (app, store) = test_app();

        let response = app
            .oneshot(json_request("POST", "/api/items", json!({ "name": 42 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_get_item_existing_id_returns_ok() {
        let (app, store) = test_app();
        let item = seed(&store, "Item 6").await;

        let response = app
            .oneshot(empty_request(
                "GET",
                &format!("/api/items/{}", item.id.unwrap()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "Item 6");
    }

    #[tokio::test]
    async fn test_get_item_non_existing_id_returns_no_content() {
        let (app, _store) = test_app();

        let response = app
            .oneshot(empty_request("GET", "/api/items/999"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_get_item_non_numeric_id_returns_bad_request() {
        let (app, _store) = test_app();

        let response = app
            .oneshot(empty_request("GET", "/api/items/abc"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_item_existing_id_returns_ok() {
        let (app, store) = test_app();
        let item = seed(&store, "Item").await;
        let id = item.id.unwrap();

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/items/{}", id),
                json!({
                    "id": id,
                    "name": "Updated Item",
                    "description": "Updated Description",
                    "status": "UPDATED",
                    "email": "updated@example.com"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stored = store.find_item(id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Updated Item");
        assert_eq!(stored.status, "UPDATED");
        assert_eq!(stored.id, Some(id));
    }

    #[tokio::test]
    async fn test_update_item_non_existing_id_returns_not_found() {
        let (app, store) = test_app();

        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/items/999",
                json!({
                    "id": 999,
                    "name": "Updated Item",
                    "description": "Updated Description",
                    "status": "UPDATED",
                    "email": "updated@example.com"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_item_invalid_input_returns_bad_request() {
        let (app, store) = test_app();
        let item = seed(&store, "Item").await;

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/items/{}", item.id.unwrap()),
                json!({
                    "name": "Updated Item",
                    "description": "Updated Description",
                    "status": "UPDATED",
                    "email": "broken"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.list_items().await.unwrap(), vec![item]);
    }

    #[tokio::test]
    async fn test_delete_item_existing_id_returns_no_content() {
        let (app, store) = test_app();
        let item = seed(&store, "Item 8").await;
        let id = item.id.unwrap();

        let response = app
            .oneshot(empty_request("DELETE", &format!("/api/items/{}", id)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.find_item(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_item_non_existing_id_returns_no_content() {
        let (app, store) = test_app();
        seed(&store, "Survivor").await;

        let response = app
            .oneshot(empty_request("DELETE", "/api/items/999"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_process_items_returns_processed_items() {
        let (app, store) = test_app();
        for i in 1..=3 {
            seed(&store, &format!("Item {i}")).await;
        }

        let response = app
            .oneshot(empty_request("GET", "/api/items/process"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&ITEMS_FAILED_HEADER], "0");
        let body = body_json(response).await;
        let processed = body.as_array().unwrap();
        assert_eq!(processed.len(), 3);
        assert!(processed.iter().all(|item| item["status"] == "PROCESSED"));

        let stored = store.list_items().await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(Item::is_processed));
    }

    #[tokio::test]
    async fn test_process_items_empty_store() {
        let (app, store) = test_app();

        let response = app
            .oneshot(empty_request("GET", "/api/items/process"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
        assert!(store.is_empty());
    }

    /// Fails every item with a chosen name
    struct FailingWork {
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl ItemWork for FailingWork {
        async fn perform(&self, item: &Item) -> Result<(), WorkError> {
            if item.name == self.name {
                return Err(WorkError::Failed(format!("cannot process {}", item.name)));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_process_items_reports_failed_count_in_header() {
        let (app, store) = test_app_with_work(Arc::new(FailingWork { name: "Broken" }));
        seed(&store, "Item 1").await;
        let broken = seed(&store, "Broken").await;
        seed(&store, "Item 3").await;

        let response = app
            .oneshot(empty_request("GET", "/api/items/process"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&ITEMS_FAILED_HEADER], "1");

        let body = body_json(response).await;
        let processed = body.as_array().unwrap();
        assert_eq!(processed.len(), 2);
        assert!(processed.iter().all(|item| item["name"] != "Broken"));

        let left = store.find_item(broken.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(left.status, ItemStatus::NEW);
    }
}
