//! Friend endpoints for authenticated players

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, StatusResponse};
use crate::api::state::AppState;
use crate::social::{Friend, FriendRequest, Friendship};
use crate::types::AccountId;

/// Body for POST /friends/request
#[derive(Debug, Deserialize)]
pub struct SendRequestInput {
    pub friend_id: AccountId,
}

/// Body for POST /friends/accept and POST /friends/decline
#[derive(Debug, Deserialize)]
pub struct HandleRequestInput {
    pub request_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub friends: Vec<Friend>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestsResponse {
    pub incoming: Vec<FriendRequest>,
    pub outgoing: Vec<FriendRequest>,
}

/// POST /friends/request - Ask another account to be friends
pub async fn send_request(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
    body: Result<Json<SendRequestInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Friendship>), ApiError> {
    let Json(input) =
        body.map_err(|_| ApiError::bad_request("invalid_request", "friend_id is required"))?;

    let friendship = state.social.send_request(account, input.friend_id)?;
    tracing::info!(
        account_id = %account,
        friend_id = %input.friend_id,
        request_id = %friendship.id,
        "Friend request sent"
    );
    Ok((StatusCode::CREATED, Json(friendship)))
}

/// POST /friends/accept - Accept a pending request addressed to the caller
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
    body: Result<Json<HandleRequestInput>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(input) =
        body.map_err(|_| ApiError::bad_request("invalid_request", "request_id is required"))?;

    state.social.accept_request(input.request_id, account)?;
    tracing::info!(account_id = %account, request_id = %input.request_id, "Friend request accepted");
    Ok(Json(StatusResponse::new("accepted")))
}

/// POST /friends/decline - Delete a pending request addressed to the caller
pub async fn decline_request(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
    body: Result<Json<HandleRequestInput>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(input) =
        body.map_err(|_| ApiError::bad_request("invalid_request", "request_id is required"))?;

    state.social.decline_request(input.request_id, account)?;
    Ok(Json(StatusResponse::new("declined")))
}

/// DELETE /friends/:friend_id - End a friendship
pub async fn remove_friend(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
    Path(friend_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let friend: AccountId = friend_id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid_id", "Invalid friend ID"))?;

    state.social.remove_friend(account, friend)?;
    tracing::info!(account_id = %account, friend_id = %friend, "Friend removed");
    Ok(Json(StatusResponse::new("removed")))
}

/// GET /friends - Confirmed friends, newest first
pub async fn list_friends(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
) -> Json<FriendsResponse> {
    Json(FriendsResponse {
        friends: state.social.list_friends(account),
    })
}

/// GET /friends/requests - Pending requests to and from the caller
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountId>,
) -> Json<RequestsResponse> {
    let (incoming, outgoing) = state.social.list_requests(account);
    Json(RequestsResponse { incoming, outgoing })
}
