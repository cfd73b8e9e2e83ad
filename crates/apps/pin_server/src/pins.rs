use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use foundation::bounds::wrap_lng;
use layers::Pin;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::store::{NewPin, PinRecord};
use crate::AppState;

// Set by the authenticating proxy in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_AVATAR_HEADER: &str = "x-user-avatar";

/// Default per-axis jitter: roughly half a kilometre at the equator.
pub const DEFAULT_JITTER_DEG: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let id = header(USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
        Ok(Self {
            name: header(USER_NAME_HEADER).unwrap_or_else(|| id.clone()),
            avatar_url: header(USER_AVATAR_HEADER),
            id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    /// Coarser fallback label when no precise location is known.
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl PinRequest {
    fn coordinates(&self) -> Result<(f64, f64), ApiError> {
        let (Some(lat), Some(lng)) = (self.lat, self.lng) else {
            return Err(ApiError::MissingCoordinates);
        };
        if !(lat.is_finite() && lng.is_finite()) || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(ApiError::InvalidCoordinates);
        }
        Ok((lat, lng))
    }

    fn location_label(&self) -> Option<String> {
        [&self.location, &self.region_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Uniform per-axis offset applied once at write time, so co-located users
/// don't stack exactly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Jitter {
    pub max_deg: f64,
}

impl Default for Jitter {
    fn default() -> Self {
        Self {
            max_deg: DEFAULT_JITTER_DEG,
        }
    }
}

impl Jitter {
    /// Latitude is clamped to the poles, longitude wrapped into `[-180, 180)`.
    pub fn apply<R: Rng>(&self, rng: &mut R, lat: f64, lng: f64) -> (f64, f64) {
        let max = self.max_deg;
        if !(max.is_finite() && max > 0.0) {
            return (lat, wrap_lng(lng));
        }
        let lat = lat + rng.gen_range(-max..=max);
        let lng = lng + rng.gen_range(-max..=max);
        (lat.clamp(-90.0, 90.0), wrap_lng(lng))
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub async fn list_pins(State(state): State<AppState>) -> Result<Json<Vec<Pin>>, ApiError> {
    let records = state.store.list().await?;
    Ok(Json(records.iter().map(PinRecord::to_pin).collect()))
}

pub async fn upsert_pin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PinRequest>,
) -> Result<Json<Pin>, ApiError> {
    let caller = Caller::from_headers(&headers)?;
    let (lat, lng) = req.coordinates()?;
    let (lat, lng) = {
        let mut rng = state.rng.lock();
        state.jitter.apply(&mut *rng, lat, lng)
    };

    let saved = state
        .store
        .upsert(
            NewPin {
                owner_id: caller.id,
                username: caller.name,
                avatar_url: caller.avatar_url,
                lat,
                lng,
                location: req.location_label(),
                is_anonymous: req.is_anonymous,
            },
            now_ms(),
        )
        .await?;

    info!(pin = %saved.id, anonymous = saved.is_anonymous, "pin saved");
    Ok(Json(saved.to_pin()))
}

pub async fn delete_pin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let caller = Caller::from_headers(&headers)?;
    let removed = state.store.delete_by_owner(&caller.id).await?;
    if removed {
        info!("pin deleted");
    }
    Ok(Json(json!({ "success": true, "removed": removed })))
}
