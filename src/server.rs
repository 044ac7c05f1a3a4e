//! HTTP API surface
//!
//! Exposes the status checker and provisioner as a JSON API:
//!
//! - `GET    /api/v1/participants/{name}/status` - full status response
//! - `GET    /api/v1/participants?status=&page=&limit=` - filtered listing
//! - `POST   /api/v1/participants` - provision a participant
//! - `DELETE /api/v1/participants` - deprovision a participant
//! - `POST   /api/v1/participants/{name}/status/invalidate` - drop the cached status
//! - `GET    /healthz` - liveness probe

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::provision::{ParticipantDefinition, Provisioner};
use crate::status::{ParticipantStatusResponse, ParticipantSummary, StatusChecker};

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Status aggregation engine
    pub checker: Arc<StatusChecker>,
    /// Manifest apply/delete surface
    pub provisioner: Arc<Provisioner>,
}

/// Listing query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Exact-match filter on the overall status string
    pub status: Option<String>,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: usize,
    /// Page size
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

/// One page of participant summaries plus the total after filtering
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantList {
    /// Summaries for the requested page
    pub items: Vec<ParticipantSummary>,
    /// Total matching participants across all pages
    pub total: usize,
}

/// Error wrapper mapping crate errors onto HTTP responses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Kube(err) if crate::error::is_not_found(err) => StatusCode::NOT_FOUND,
            err if err.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

/// Create the API router
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route(
            "/api/v1/participants",
            get(list_participants)
                .post(provision_participant)
                .delete(deprovision_participant),
        )
        .route(
            "/api/v1/participants/{name}/status",
            get(participant_status),
        )
        .route(
            "/api/v1/participants/{name}/status/invalidate",
            axum::routing::post(invalidate_status),
        )
        .with_state(state)
}

async fn participant_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ParticipantStatusResponse>, ApiError> {
    let response = state.checker.get_status(&name).await?;
    Ok(Json(response))
}

async fn list_participants(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ParticipantList>, ApiError> {
    if query.page == 0 {
        return Err(Error::validation("page must be >= 1").into());
    }
    if query.limit == 0 {
        return Err(Error::validation("limit must be >= 1").into());
    }

    let (items, total) = state
        .checker
        .list_participants(query.status.as_deref(), query.page, query.limit)
        .await?;
    Ok(Json(ParticipantList { items, total }))
}

async fn provision_participant(
    State(state): State<AppState>,
    Json(definition): Json<ParticipantDefinition>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    definition.validate()?;
    let resources = state.provisioner.provision(&definition).await?;
    Ok(Json(resources))
}

async fn deprovision_participant(
    State(state): State<AppState>,
    Json(definition): Json<ParticipantDefinition>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    definition.validate()?;
    let resources = state.provisioner.deprovision(&definition).await?;
    Ok(Json(resources))
}

async fn invalidate_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> StatusCode {
    state.checker.invalidate(&name).await;
    StatusCode::NO_CONTENT
}
