//! Served city listing.

use axum::Json;
use axum::extract::State;

use crate::cities::CityInfo;
use crate::state::AppState;

/// List served cities in lookup order.
pub async fn list_cities(State(state): State<AppState>) -> Json<Vec<CityInfo>> {
    Json(
        state
            .cities()
            .cities()
            .iter()
            .map(|city| CityInfo::from(city.as_ref()))
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::tests::get_json;

    #[tokio::test]
    async fn test_lists_bundled_cities() {
        let (status, json) = get_json("/api/cities").await;

        assert_eq!(status, StatusCode::OK);
        let cities = json.as_array().unwrap();
        assert!(cities.iter().any(|c| c["slug"] == "tura"));
        assert!(cities.iter().any(|c| c["slug"] == "guwahati"));
        assert!(cities.iter().all(|c| c.get("boundary").is_none()));
    }
}
