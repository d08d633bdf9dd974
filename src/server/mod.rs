//! HTTP surface of the bot.
//!
//! Nothing here affects wishing; the endpoints exist for liveness checks and
//! for inspecting what the bot has recorded.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns 200 if the server is running
//! - `GET /api/v1/records` - Every stored record as JSON
//! - `GET /api/v1/records/{username}` - One user's record, 404 if unknown

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod records;

pub use records::{record_handler, records_handler};

use crate::store::RecordStore;

/// Shared application state, passed to handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    store: Arc<RecordStore>,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>) -> Self {
        AppState { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

/// Liveness check: 200 with the text "OK" while the process is serving.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/records", get(records_handler))
        .route("/api/v1/records/{username}", get(record_handler))
        .with_state(app_state)
}

/// Serves the router on `addr` until `shutdown` is cancelled.
pub async fn serve(
    addr: SocketAddr,
    app_state: AppState,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, build_router(app_state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::store::UserAnniversaryRecord;
    use crate::test_utils::utc;
    use crate::types::Username;

    fn test_app_state() -> (AppState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("cakedays.json")).unwrap();
        (AppState::new(Arc::new(store)), dir)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let (state, _dir) = test_app_state();
        let app = build_router(state);

        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn records_empty_store() {
        let (state, _dir) = test_app_state();
        let app = build_router(state);

        let response = app.oneshot(get("/api/v1/records")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["count"], 0);
        assert_eq!(body["records"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn records_lists_sorted_by_username() {
        let (state, _dir) = test_app_state();
        let store = state.store();
        store
            .set(UserAnniversaryRecord::new(
                Username::from("bob"),
                utc(2016, 5, 2, 8, 0),
            ))
            .unwrap();
        let mut alice = UserAnniversaryRecord::new(Username::from("alice"), utc(2015, 3, 14, 10, 0));
        alice.years_wished.insert(2024);
        store.set(alice).unwrap();

        let response = build_router(state).oneshot(get("/api/v1/records")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["records"][0]["username"], "alice");
        assert_eq!(body["records"][0]["years_wished"][0], 2024);
        assert_eq!(body["records"][1]["username"], "bob");
    }

    #[tokio::test]
    async fn single_record_lookup() {
        let (state, _dir) = test_app_state();
        state
            .store()
            .set(UserAnniversaryRecord::new(
                Username::from("alice"),
                utc(2015, 3, 14, 10, 0),
            ))
            .unwrap();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(get("/api/v1/records/alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["username"], "alice");

        let response = app.oneshot(get("/api/v1/records/nobody")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serve_stops_on_cancellation() {
        let (state, _dir) = test_app_state();
        let token = CancellationToken::new();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let server = tokio::spawn(serve(addr, state, token.clone()));
        token.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
