//! Route layers for WeChat third-party platform endpoints.
//!
//! Each layer wraps an axum handler using Tower patterns: it prepares
//! request data, publishes it through request extensions, calls the handler
//! and post-processes the handler's response.
//!
//! ## Layer Types
//!
//! - [`ComponentNotifyLayer`] - Receives ticket and authorization notifications
//! - [`AuthCallLayer`] - Prepares the authorization page URL
//! - [`AuthCallbackLayer`] - Exchanges the authorization code for a client
//! - [`AuthorizerNotifyLayer`] - Decrypts authorizer pushes and encrypts replies
//!
//! Apply them with `route_layer` (or `MethodRouter::layer`) so route
//! parameters such as `:appid` are available.
//!
//! ## Usage
//!
//! ```ignore
//! use axum::{routing::{get, post}, Extension, Router};
//! use wechat_component::middleware::{AuthCallLayer, ComponentNotifyLayer};
//! use wechat_component::message::ComponentMessage;
//! use wechat_component::AuthorizationSession;
//!
//! let app = Router::new()
//!     .route(
//!         "/component/notify",
//!         post(|Extension(msg): Extension<ComponentMessage>| async move { "success" })
//!             .layer(ComponentNotifyLayer::new(component.clone())),
//!     )
//!     .route(
//!         "/component/authcall",
//!         get(|Extension(auth): Extension<AuthorizationSession>| async move { auth.url })
//!             .layer(AuthCallLayer::new(component.clone(), "/component/callback")),
//!     );
//! ```

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::{StatusCode, Uri};
use log::{error, warn};

use crate::error::WechatError;

// Re-export tower types for convenience
pub use tower::{Layer, Service, ServiceBuilder};

mod authcall;
mod authorizer_notify;
mod callback;
mod notify;

pub use authcall::{AuthCallLayer, AuthCallService};
pub use authorizer_notify::{AuthorizerNotifyLayer, AuthorizerNotifyService};
pub use callback::{AuthCallbackLayer, AuthCallbackService};
pub use notify::{ComponentNotifyLayer, ComponentNotifyService};

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub(crate) fn query_params(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(params)| params)
        .unwrap_or_default()
}

pub(crate) async fn path_param(parts: &mut Parts, name: &str) -> Option<String> {
    let params = RawPathParams::from_request_parts(parts, &()).await.ok()?;
    params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

pub(crate) async fn read_text(body: Body) -> Result<String, WechatError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| WechatError::Xml(format!("failed to read body: {}", e)))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| WechatError::Xml(format!("body is not valid UTF-8: {}", e)))
}

pub(crate) async fn call_inner<S>(inner: &mut S, req: axum::extract::Request) -> Response
where
    S: Service<axum::extract::Request, Response = Response, Error = Infallible>,
{
    match inner.call(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Map an error to the HTTP response returned instead of the handler's
pub(crate) fn error_response(err: &WechatError) -> Response {
    let status = match err {
        WechatError::Xml(_) | WechatError::Crypto(_) | WechatError::MissingParameter(_) => {
            StatusCode::BAD_REQUEST
        }
        WechatError::Signature(_) => StatusCode::UNAUTHORIZED,
        WechatError::Http(_)
        | WechatError::Api { .. }
        | WechatError::Token(_)
        | WechatError::MissingTicket => StatusCode::BAD_GATEWAY,
        WechatError::Json(_) | WechatError::Config(_) | WechatError::Handler(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        error!("[WechatComponent] request failed: {}", err);
    } else {
        warn!("[WechatComponent] request rejected: {}", err);
    }

    let reason = status.canonical_reason().unwrap_or("error");
    (status, reason).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;

    #[test]
    fn test_query_params_decoding() {
        let uri: Uri = "/notify?msg_signature=abc&nonce=a%20b&timestamp=1"
            .parse()
            .unwrap();
        let params = query_params(&uri);
        assert_eq!(params.get("msg_signature").map(String::as_str), Some("abc"));
        assert_eq!(params.get("nonce").map(String::as_str), Some("a b"));
        assert_eq!(params.get("timestamp").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_query_params_missing() {
        let uri: Uri = "/notify".parse().unwrap();
        assert!(query_params(&uri).is_empty());
    }

    #[test]
    fn test_error_response_status() {
        assert_eq!(
            error_response(&WechatError::Xml("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&WechatError::Signature("bad".into())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_response(&WechatError::MissingTicket).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(&WechatError::Http(HttpError::Decode("x".into()))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(&WechatError::Config("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_response(&WechatError::Handler("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_read_text() {
        assert_eq!(read_text(Body::from("<xml/>")).await.unwrap(), "<xml/>");
        let invalid = Body::from(vec![0xff, 0xfe]);
        assert!(matches!(read_text(invalid).await, Err(WechatError::Xml(_))));
    }
}
