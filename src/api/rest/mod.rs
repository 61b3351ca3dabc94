//! REST API module
//!
//! Player routes, authenticated with a bearer JWT:
//! - `/friends` - Friend requests and the friend list
//! - `/blocks` - Blocked accounts
//!
//! Service-to-service presence lookups, guarded by the service secret:
//! - `GET /internal/presence/:account_id` - Single account
//! - `POST /internal/presence/bulk` - Many accounts at once
//! - `GET /internal/presence/count` - Number of online accounts

pub mod blocks;
pub mod friends;
pub mod presence;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::AuthError;
use crate::error::SocialError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(error: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn unauthorized(error: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error, message)
    }
}

/// `{"status": "..."}` acknowledgement for mutations
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => {
                Self::unauthorized("missing_token", "Authentication token is required")
            }
            _ => Self::unauthorized("invalid_token", "Invalid or expired token"),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(e: SocialError) -> Self {
        let (status, error) = match &e {
            SocialError::SelfFriend => (StatusCode::BAD_REQUEST, "self_friend"),
            SocialError::SelfBlock => (StatusCode::BAD_REQUEST, "self_block"),
            SocialError::Blocked => (StatusCode::FORBIDDEN, "blocked"),
            SocialError::AlreadyFriends => (StatusCode::CONFLICT, "already_friends"),
            SocialError::RequestExists => (StatusCode::CONFLICT, "request_exists"),
            SocialError::AlreadyBlocked => (StatusCode::CONFLICT, "already_blocked"),
            SocialError::RequestNotFound | SocialError::BlockNotFound => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            SocialError::NotFriends => (StatusCode::NOT_FOUND, "not_friends"),
            SocialError::Io(_) | SocialError::Parse(_) => {
                tracing::error!(error = %e, "Social graph failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        Self::new(status, error, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
