//! HTTP route handlers for the geofence service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (database ping)
//!
//! # Access
//! GET  /api/access?lat=&lon=[&subtotal=] - Classify a location
//! GET  /api/cities                    - Served cities
//!
//! # Saved locations
//! POST /api/locations                 - Classify and save a user location
//! GET  /api/users/{user_id}/locations - A user's saved locations, primary first
//! ```

pub mod access;
pub mod cities;
pub mod locations;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// All service routes, without state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/access", get(access::check_access))
        .route("/api/cities", get(cities::list_cities))
        .route("/api/locations", post(locations::save_location))
        .route(
            "/api/users/{user_id}/locations",
            get(locations::list_user_locations),
        )
}

/// The service router with request tracing and CORS, bound to `state`.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::cities::CityBoundaryIndex;
    use crate::config::GeofenceConfig;

    /// State over the bundled cities and a pool that never connects.
    ///
    /// Paths that reach the database fail within the 200ms zone query timeout.
    pub fn offline_state() -> AppState {
        let config = GeofenceConfig::from_lookup(|key| match key {
            "GEOFENCE_DATABASE_URL" => Some("postgres://localhost:1/dayliz_test".to_string()),
            "GEOFENCE_ZONE_QUERY_TIMEOUT_MS" => Some("200".to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/dayliz_test")
            .unwrap();
        AppState::new(config, pool, CityBoundaryIndex::bundled().unwrap())
    }

    pub async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app(offline_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(offline_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get_json("/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
