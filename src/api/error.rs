//! Failures as seen by HTTP clients: a status code and `{"error": "<message>"}`.

use crate::{otp::OtpError, store::StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Misconfigured(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    MalformedPayload(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Misconfigured(_) | Self::Upstream(_) | Self::MalformedPayload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub(crate) fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingCredentials => Self::Misconfigured(err.to_string()),
            StoreError::MalformedPayload(_) => Self::MalformedPayload(err.to_string()),
            StoreError::Upstream { .. } | StoreError::Transport(_) | StoreError::Encode(_) => {
                Self::Upstream(err.to_string())
            }
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::InvalidRequest(_)
            | OtpError::NoOtpRequested
            | OtpError::OtpExpired
            | OtpError::InvalidOtp => Self::Validation(err.to_string()),
            OtpError::UserNotFound => Self::NotFound(err.to_string()),
            OtpError::MissingCredential => Self::Misconfigured(err.to_string()),
            OtpError::EmailDeliveryFailed(_) => Self::Upstream(err.to_string()),
            OtpError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
