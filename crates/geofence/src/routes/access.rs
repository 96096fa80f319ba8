//! Location access check.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use dayliz_core::{Coordinate, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::access::AccessSummary;
use crate::error::Result;
use crate::state::AppState;
use crate::zones::DeliveryQuote;

/// Query parameters for `GET /api/access`.
#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub lat: f64,
    pub lon: f64,
    /// Cart subtotal in INR; when given and ordering is possible, a delivery quote is returned.
    pub subtotal: Option<Decimal>,
}

/// Response body for `GET /api/access`.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    #[serde(flatten)]
    pub summary: AccessSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<DeliveryQuote>,
}

/// Classify a location.
///
/// Coverage decisions answer 200. A failed zone lookup answers 503 with the
/// same body so the client can show a retry instead of "not available".
#[instrument(skip(state))]
pub async fn check_access(
    State(state): State<AppState>,
    Query(query): Query<AccessQuery>,
) -> Result<(StatusCode, Json<AccessResponse>)> {
    let point = Coordinate::new(query.lat, query.lon)?;
    let result = state.classifier().detect_access_level(point).await;

    let quote = query
        .subtotal
        .zip(result.zone())
        .map(|(subtotal, zone)| zone.quote(Price::inr(subtotal)));

    let status = if result.is_error() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(AccessResponse {
            summary: AccessSummary::from(&result),
            quote,
        }),
    ))
}
