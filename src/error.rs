use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::transition::Action;
use crate::models::delivery::DeliveryStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid coordinate: lat {lat}, lng {lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("invalid transition: cannot {action} while {current:?}")]
    InvalidTransition {
        current: DeliveryStatus,
        action: Action,
    },

    #[error("delivery already assigned to courier {courier_id}")]
    AlreadyAssigned { courier_id: Uuid },

    #[error("proof insufficient: {0}")]
    ProofInsufficient(String),

    #[error("otp does not match the delivery confirmation code")]
    OtpMismatch,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
            StoreError::NotFound(what) => EngineError::NotFound(what),
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::BadRequest(_) | EngineError::InvalidCoordinate { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::InvalidTransition { .. } | EngineError::AlreadyAssigned { .. } => {
                StatusCode::CONFLICT
            }
            EngineError::ProofInsufficient(_) | EngineError::OtpMismatch => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
