//! Read-only view of the record store.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use super::AppState;
use crate::store::{StoreError, UserAnniversaryRecord};
use crate::types::Username;

/// Errors that can occur when reading records.
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("no record for {0}")]
    NotFound(Username),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for RecordsError {
    fn into_response(self) -> Response {
        let status = match &self {
            RecordsError::NotFound(_) => StatusCode::NOT_FOUND,
            RecordsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Body of `GET /api/v1/records`.
#[derive(Debug, Serialize)]
pub struct RecordsBody {
    pub count: usize,
    pub records: Vec<UserAnniversaryRecord>,
}

/// Lists every stored record, sorted by username.
///
/// ```ignore
/// GET /api/v1/records HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// {"count": 1, "records": [{"username": "alice", "created_at": "...", "years_wished": [2024]}]}
/// ```
pub async fn records_handler(
    State(app_state): State<AppState>,
) -> Result<Json<RecordsBody>, RecordsError> {
    let records = app_state.store().records()?;
    Ok(Json(RecordsBody {
        count: records.len(),
        records,
    }))
}

/// Returns one user's record, or 404 if the bot has never seen them.
pub async fn record_handler(
    State(app_state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserAnniversaryRecord>, RecordsError> {
    let username = Username::from(username);
    match app_state.store().get(&username)? {
        Some(record) => Ok(Json(record)),
        None => Err(RecordsError::NotFound(username)),
    }
}
