use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::store::PinStoreError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    MissingCoordinates,
    InvalidCoordinates,
    Store(PinStoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingCoordinates | Self::InvalidCoordinates => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::MissingCoordinates => write!(f, "Missing coordinates"),
            Self::InvalidCoordinates => write!(f, "Invalid coordinates"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<PinStoreError> for ApiError {
    fn from(err: PinStoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if let Self::Store(err) = &self {
            tracing::error!("pin store failure: {err}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
