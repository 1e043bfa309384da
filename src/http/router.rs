//! Top-level router: classifies by method + path, delegates to handlers.

use serde::Deserialize;

use crate::http::codec::{Request, Response};
use crate::http::handlers::{self, assets::StaticAssets};
use crate::state::AppState;
use crate::types::{Error, Key, Result};

/// Supported request signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    AddKey,
    RemoveKey,
    ListKeys,
    ListActivity,
    Favicon,
    Index,
}

impl Route {
    pub fn classify(request: &Request) -> Option<Self> {
        match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/agregar") => Some(Route::AddKey),
            ("POST", "/eliminar") => Some(Route::RemoveKey),
            ("GET", "/claves") => Some(Route::ListKeys),
            ("GET", "/log") => Some(Route::ListActivity),
            ("GET", "/favicon.ico") => Some(Route::Favicon),
            ("GET", "/") => Some(Route::Index),
            _ => None,
        }
    }
}

/// Everything a connection worker may touch.
#[derive(Debug, Clone)]
pub struct Context {
    pub state: AppState,
    pub assets: StaticAssets,
}

/// Route a request to its handler.
///
/// `Ok(None)` means the signature is not recognized; the caller closes the
/// connection without answering.
pub async fn route_request(ctx: &Context, request: &Request) -> Result<Option<Response>> {
    let Some(route) = Route::classify(request) else {
        return Ok(None);
    };
    let response = match route {
        Route::AddKey => handlers::keys::add(&ctx.state, &request.body).await?,
        Route::RemoveKey => handlers::keys::remove(&ctx.state, &request.body).await?,
        Route::ListKeys => handlers::keys::list(&ctx.state)?,
        Route::ListActivity => handlers::activity::list(&ctx.state)?,
        Route::Favicon => ctx.assets.favicon().await?,
        Route::Index => ctx.assets.index().await?,
    };
    Ok(Some(response))
}

// =============================================================================
// Shared helpers: used by handler modules
// =============================================================================

#[derive(Debug, Deserialize)]
struct KeyBody {
    clave: Key,
}

/// Extract the code from an admin body of the form `{"clave":"XXXX"}`.
pub fn key_field(body: &[u8]) -> Result<Key> {
    serde_json::from_slice::<KeyBody>(body)
        .map(|b| b.clave)
        .map_err(|e| Error::validation(format!("invalid key body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceGateway, SimulatedDevice};

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    fn context() -> Context {
        let (device, _feeder) = SimulatedDevice::new();
        Context {
            state: AppState::new(DeviceGateway::new(device)),
            assets: StaticAssets::new("does-not-exist"),
        }
    }

    #[test]
    fn test_classify() {
        let cases = [
            ("POST /agregar HTTP/1.1\r\n\r\n", Some(Route::AddKey)),
            ("POST /eliminar HTTP/1.1\r\n\r\n", Some(Route::RemoveKey)),
            ("GET /claves HTTP/1.1\r\n\r\n", Some(Route::ListKeys)),
            ("GET /log HTTP/1.1\r\n\r\n", Some(Route::ListActivity)),
            ("GET /favicon.ico HTTP/1.1\r\n\r\n", Some(Route::Favicon)),
            ("GET / HTTP/1.1\r\n\r\n", Some(Route::Index)),
            ("GET /agregar HTTP/1.1\r\n\r\n", None),
            ("POST /claves HTTP/1.1\r\n\r\n", None),
            ("DELETE /claves HTTP/1.1\r\n\r\n", None),
            ("GET /index.html HTTP/1.1\r\n\r\n", None),
        ];
        for (raw, expected) in cases {
            assert_eq!(Route::classify(&request(raw)), expected, "{}", raw);
        }
    }

    #[test]
    fn test_key_field() {
        assert_eq!(key_field(br#"{"clave":"1234"}"#).unwrap().as_str(), "1234");
        assert_eq!(key_field(br#" { "clave" : "AB12" } "#).unwrap().as_str(), "AB12");
        assert!(key_field(br#"{"clave":1234}"#).is_err());
        assert!(key_field(br#"{"clave":"12 4"}"#).is_err());
    }

    #[tokio::test]
    async fn test_unknown_route_has_no_response() {
        let ctx = context();
        let resp = route_request(&ctx, &request("GET /admin HTTP/1.1\r\n\r\n"))
            .await
            .unwrap();
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_routes_to_key_handlers() {
        let ctx = context();
        let add = request("POST /agregar HTTP/1.1\r\nContent-Length: 16\r\n\r\n{\"clave\":\"4321\"}");
        let resp = route_request(&ctx, &add).await.unwrap().unwrap();
        assert_eq!(resp.body, br#"["4321"]"#.to_vec());

        let list = request("GET /claves HTTP/1.1\r\n\r\n");
        let resp = route_request(&ctx, &list).await.unwrap().unwrap();
        assert_eq!(resp.body, br#"["4321"]"#.to_vec());
    }

    #[tokio::test]
    async fn test_missing_asset_is_error() {
        let ctx = context();
        let result = route_request(&ctx, &request("GET / HTTP/1.1\r\n\r\n")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
