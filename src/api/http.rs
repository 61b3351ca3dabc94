//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{bearer_token, constant_time_eq, AuthError};
use super::rest::{blocks, friends, presence, ApiError};
use super::state::AppState;
use super::websocket::ws_handler;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Player routes (JWT bearer auth)
    let player = Router::new()
        .route("/friends", get(friends::list_friends))
        .route("/friends/request", post(friends::send_request))
        .route("/friends/accept", post(friends::accept_request))
        .route("/friends/decline", post(friends::decline_request))
        .route("/friends/requests", get(friends::list_requests))
        .route("/friends/:friend_id", delete(friends::remove_friend))
        .route("/blocks", get(blocks::list_blocked).post(blocks::block_user))
        .route("/blocks/:account_id", delete(blocks::unblock_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_player_token,
        ));

    // Internal service routes (service token auth)
    let internal = Router::new()
        .route("/presence/count", get(presence::online_count))
        .route("/presence/bulk", post(presence::bulk_presence))
        .route("/presence/:account_id", get(presence::get_presence))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service_token,
        ));

    Router::new()
        // WebSocket endpoint, JWT via query param
        .route("/ws", get(ws_handler))
        // Health check
        .route("/health", get(health_check))
        .merge(player)
        .nest("/internal", internal)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub online_count: usize,
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "presence-hub".to_string(),
        status: "healthy".to_string(),
        online_count: state.query.count(),
    })
}

/// Reject internal requests without the service bearer token
async fn require_service_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            constant_time_eq(bearer_token(value).as_bytes(), state.service_secret.as_bytes())
        })
        .unwrap_or(false);

    if !authorized {
        return ApiError::unauthorized("unauthorized", "Invalid service token").into_response();
    }

    next.run(request).await
}

/// Resolve the calling player from `Authorization: Bearer <jwt>`
///
/// The account id is handed to handlers as a request extension.
async fn require_player_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let account = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) => state.auth.validate_authorization(value),
        None => Err(AuthError::MissingToken),
    };

    match account {
        Ok(account) => {
            request.extensions_mut().insert(account);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected player request");
            ApiError::from(e).into_response()
        }
    }
}
