//! Saved user locations.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use dayliz_core::{Coordinate, LocationType, UserId};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::access::AccessSummary;
use crate::db::UserLocationRepository;
use crate::db::locations::{NewUserLocation, UserLocation};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Request body for `POST /api/locations`.
#[derive(Debug, Deserialize)]
pub struct SaveLocationRequest {
    pub user_id: UserId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address_text: Option<String>,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub is_primary: bool,
}

/// Response body for `POST /api/locations`.
#[derive(Debug, Serialize)]
pub struct SaveLocationResponse {
    pub location: UserLocation,
    pub access: AccessSummary,
}

/// Classify a location and save it with the resolved zone and town.
///
/// A location whose zone status cannot be determined is not saved; the client
/// gets 503 and may retry.
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn save_location(
    State(state): State<AppState>,
    Json(request): Json<SaveLocationRequest>,
) -> Result<(StatusCode, Json<SaveLocationResponse>)> {
    let point = Coordinate::new(request.latitude, request.longitude)?;
    let access = state.classifier().detect_access_level(point).await;

    if access.is_error() {
        return Err(AppError::ServiceUnavailable(
            access.message().unwrap_or("zone lookup failed").to_string(),
        ));
    }

    let new_location = NewUserLocation::from_access(request.user_id, &access)
        .with_address(request.address_text)
        .with_type(request.location_type)
        .primary(request.is_primary);

    let location = UserLocationRepository::new(state.pool())
        .save(&new_location)
        .await?;

    tracing::info!(
        location_id = %location.id,
        access_level = ?access.access_level(),
        "User location saved"
    );

    Ok((
        StatusCode::CREATED,
        Json(SaveLocationResponse {
            location,
            access: AccessSummary::from(&access),
        }),
    ))
}

/// List a user's saved locations, primary first.
#[instrument(skip(state))]
pub async fn list_user_locations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserLocation>>> {
    let locations = UserLocationRepository::new(state.pool())
        .list_for_user(UserId::new(user_id))
        .await?;
    Ok(Json(locations))
}
