//! Presence endpoints for internal callers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::api::state::AppState;
use crate::types::AccountId;

/// Response for GET /internal/presence/:account_id
#[derive(Debug, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub account_id: AccountId,
    pub online: bool,
}

/// Body for POST /internal/presence/bulk
#[derive(Debug, Deserialize)]
pub struct BulkPresenceRequest {
    pub account_ids: Vec<AccountId>,
}

/// Response for POST /internal/presence/bulk, keyed by account id string
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkPresenceResponse {
    pub presence: HashMap<String, bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineCountResponse {
    pub online_count: usize,
}

/// GET /internal/presence/:account_id - Is a single account online
pub async fn get_presence(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Response {
    let account: AccountId = match account_id.parse() {
        Ok(id) => id,
        Err(_) => return ApiError::bad_request("invalid_id", "Invalid user ID").into_response(),
    };

    Json(PresenceResponse {
        account_id: account,
        online: state.query.is_online(account),
    })
    .into_response()
}

/// POST /internal/presence/bulk - Which of the given accounts are online
pub async fn bulk_presence(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BulkPresenceRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bulk presence body");
            return ApiError::bad_request("invalid_request", "account_ids is required")
                .into_response();
        }
    };

    let presence = state
        .query
        .bulk_online(&request.account_ids)
        .into_iter()
        .map(|(id, online)| (id.to_string(), online))
        .collect();

    Json(BulkPresenceResponse { presence }).into_response()
}

/// GET /internal/presence/count - Total connected accounts
pub async fn online_count(State(state): State<Arc<AppState>>) -> Json<OnlineCountResponse> {
    Json(OnlineCountResponse {
        online_count: state.query.count(),
    })
}
