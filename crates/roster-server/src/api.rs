// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API for the student and teacher collections.
//!
//! Every collection exposes the same three routes under `/api`:
//! a listing, a create and a delete that compacts the remaining ids.
//! Failures surface as a 500 whose body names the action that failed;
//! the underlying store error is only logged.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use roster_core::{Collection, Entity, Payload, RosterError, Store, registry};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Pooled store handle.
    pub store: Arc<dyn Store>,
}

/// Success body for create and delete.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

/// Body of `/healthz` and `/readyz`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// `ok`, `ready` or `not ready`.
    pub status: &'static str,
}

/// A failed request. Rendered as 500 `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    message: String,
}

impl ApiError {
    /// Log the cause and keep only the action name for the client.
    fn failed(action: &str, collection: Collection, cause: RosterError) -> Self {
        error!(
            collection = %collection,
            error_code = cause.error_code(),
            error = %cause,
            "{} {} failed", action, collection
        );
        Self {
            message: format!("{} {} failed", action, collection),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Build the HTTP router over the given store.
pub fn build_router(store: Arc<dyn Store>) -> Router {
    let api = Router::new()
        .route("/student", get(list_students))
        .route("/addstudent", post(add_student))
        .route("/student/{id}", delete(delete_student))
        .route("/teacher", get(list_teachers))
        .route("/addteacher", post(add_teacher))
        .route("/teacher/{id}", delete(delete_teacher));

    Router::new()
        .nest("/api", api)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Entity>>, ApiError> {
    list_collection(&state, Collection::Student).await
}

async fn add_student(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    add_to_collection(&state, Collection::Student, &body).await
}

async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_from_collection(&state, Collection::Student, id).await
}

async fn list_teachers(State(state): State<AppState>) -> Result<Json<Vec<Entity>>, ApiError> {
    list_collection(&state, Collection::Teacher).await
}

async fn add_teacher(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    add_to_collection(&state, Collection::Teacher, &body).await
}

async fn delete_teacher(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_from_collection(&state, Collection::Teacher, id).await
}

async fn list_collection(
    state: &AppState,
    collection: Collection,
) -> Result<Json<Vec<Entity>>, ApiError> {
    registry::list(state.store.as_ref(), collection)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Fetch", collection, e))
}

async fn add_to_collection(
    state: &AppState,
    collection: Collection,
    body: &Value,
) -> Result<Json<MessageResponse>, ApiError> {
    let payload = Payload::from_json(collection, body);
    registry::create(state.store.as_ref(), &payload)
        .await
        .map_err(|e| ApiError::failed("Insert", collection, e))?;

    Ok(Json(MessageResponse {
        message: format!("{} inserted successfully", collection.label()),
    }))
}

async fn delete_from_collection(
    state: &AppState,
    collection: Collection,
    id: i64,
) -> Result<Json<MessageResponse>, ApiError> {
    registry::remove_and_compact(state.store.as_ref(), collection, id)
        .await
        .map_err(|e| ApiError::failed("Delete", collection, e))?;

    Ok(Json(MessageResponse {
        message: format!("{} deleted successfully", collection.label()),
    }))
}

async fn healthz() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(StatusResponse { status: "ready" })),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusResponse {
                    status: "not ready",
                }),
            )
        }
    }
}
