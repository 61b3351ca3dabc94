//! Block endpoints for authenticated players

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, StatusResponse};
use crate::api::state::AppState;
use crate::social::BlockedUser;
use crate::types::AccountId;

/// Body for POST /blocks
#[derive(Debug, Deserialize)]
pub struct BlockInput {
    pub account_id: AccountId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlocksResponse {
    pub blocks: Vec<BlockedUser>,
}

/// POST /blocks - Block an account, ending any friendship with it
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
    body: Result<Json<BlockInput>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let Json(input) =
        body.map_err(|_| ApiError::bad_request("invalid_request", "account_id is required"))?;

    state.social.block(account, input.account_id)?;
    tracing::info!(account_id = %account, blocked_id = %input.account_id, "Account blocked");
    Ok((StatusCode::CREATED, Json(StatusResponse::new("blocked"))))
}

/// DELETE /blocks/:account_id
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
    Path(blocked_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let blocked: AccountId = blocked_id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid_id", "Invalid account ID"))?;

    state.social.unblock(account, blocked)?;
    Ok(Json(StatusResponse::new("unblocked")))
}

/// GET /blocks
pub async fn list_blocked(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
) -> Json<BlocksResponse> {
    Json(BlocksResponse {
        blocks: state.social.list_blocked(account),
    })
}
