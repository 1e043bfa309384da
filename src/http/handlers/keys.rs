//! Allow-list handlers: add, remove, list.

use crate::device::ADMIN_ACK;
use crate::http::codec::Response;
use crate::http::router::key_field;
use crate::state::AppState;
use crate::types::Result;

/// `POST /agregar`: insert the code, pulse amber if it was new.
pub async fn add(state: &AppState, body: &[u8]) -> Result<Response> {
    let key = key_field(body)?;
    match state.keys.insert(&key)? {
        Some(slot) => {
            tracing::info!(code = %key, slot = slot.get(), "key_added");
            acknowledge(state).await;
        }
        None => tracing::info!(
            code = %key,
            capacity = state.keys.capacity(),
            "key_not_added (duplicate or store full)"
        ),
    }
    list(state)
}

/// `POST /eliminar`: remove the code, pulse amber if it was present.
pub async fn remove(state: &AppState, body: &[u8]) -> Result<Response> {
    let key = key_field(body)?;
    match state.keys.remove(&key)? {
        Some(slot) => {
            tracing::info!(code = %key, slot = slot.get(), "key_removed");
            acknowledge(state).await;
        }
        None => tracing::info!(code = %key, "key_not_removed (absent)"),
    }
    list(state)
}

/// `GET /claves`: `["AAAA","BBBB",...]` in slot order.
pub fn list(state: &AppState) -> Result<Response> {
    let keys = state.keys.snapshot()?;
    Ok(Response::json(serde_json::to_vec(&keys)?))
}

async fn acknowledge(state: &AppState) {
    if let Err(e) = state.gateway.write(ADMIN_ACK).await {
        tracing::error!("admin_ack_failed: {}", e);
    }
}
