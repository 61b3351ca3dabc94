//! WebSocket connection handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::api::auth::AuthError;
use crate::api::rest::ApiError;
use crate::api::state::AppState;
use crate::presence::{CloseSignal, ConnectionHandle, Session};
use crate::types::AccountId;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Player JWT
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// The token is checked before the upgrade so unauthenticated clients get a
/// plain 401.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let account = match authenticate(&state, params.token.as_deref()) {
        Ok(account) => account,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected WebSocket connection");
            return ApiError::from(e).into_response();
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, account)),
        Err(rejection) => rejection.into_response(),
    }
}

fn authenticate(state: &AppState, token: Option<&str>) -> Result<AccountId, AuthError> {
    match token {
        Some(token) if !token.is_empty() => state.auth.validate_token(token),
        _ => Err(AuthError::MissingToken),
    }
}

/// Run one authenticated connection until it ends
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, account: AccountId) {
    let (sink, stream) = socket.split();
    let (handle, outbound) = ConnectionHandle::new(state.outbound_buffer);
    let connection = handle.id();

    // The writer owns the sink and exits once the handle is closed
    tokio::spawn(write_outbound(sink, outbound, handle.close_signal()));

    tracing::info!(account_id = %account, connection = %connection, "WebSocket connection established");

    let end = Session::new(state.registry.clone(), account, state.session)
        .run(handle, stream)
        .await;

    tracing::info!(
        account_id = %account,
        connection = %connection,
        reason = ?end,
        "WebSocket connection terminated"
    );
}

/// Forward queued payloads to the client
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Arc<str>>,
    signal: CloseSignal,
) {
    loop {
        tokio::select! {
            _ = signal.closed() => break,
            payload = outbound.recv() => match payload {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.to_string())).await {
                        tracing::debug!(error = %e, "WebSocket write failed");
                        // Write failure ends the session
                        signal.close();
                        return;
                    }
                }
                None => break,
            },
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}
