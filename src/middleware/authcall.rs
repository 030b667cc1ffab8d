//! Authorization entry endpoint.
//!
//! Creates a pre-auth code and the login page URL the account owner should
//! be sent to. The handler decides how to present it (redirect, link, QR).

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use http::header::HOST;
use http::request::Parts;
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tower::{Layer, Service};

use super::{call_inner, error_response};
use crate::client::Component;
use crate::error::WechatError;
use crate::utils::quote_plus;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Characters escaped inside a path segment
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Callback route: a path template plus parameters
///
/// Parameters named by a `:name` or `{name}` segment are substituted into
/// the path; the rest become a form-encoded query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallbackRoute {
    path: String,
    params: Vec<(String, String)>,
}

impl CallbackRoute {
    fn expand(&self) -> Result<String, WechatError> {
        let mut used = vec![false; self.params.len()];
        let mut segments = Vec::new();

        for segment in self.path.split('/') {
            let placeholder = segment
                .strip_prefix(':')
                .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')));

            match placeholder {
                Some(name) => {
                    let index = self
                        .params
                        .iter()
                        .position(|(key, _)| key == name)
                        .ok_or_else(|| {
                            WechatError::Config(format!(
                                "no value for callback route parameter {}",
                                name
                            ))
                        })?;
                    used[index] = true;
                    segments.push(
                        utf8_percent_encode(&self.params[index].1, SEGMENT_ENCODE_SET)
                            .to_string(),
                    );
                }
                None => segments.push(segment.to_string()),
            }
        }

        let mut url = segments.join("/");
        let query = self
            .params
            .iter()
            .zip(used)
            .filter(|(_, used)| !used)
            .map(|((key, value), _)| format!("{}={}", quote_plus(key), quote_plus(value)))
            .collect::<Vec<_>>();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        Ok(url)
    }
}

/// Scheme and host the request was addressed to
fn request_root(parts: &Parts) -> Result<String, WechatError> {
    let host = parts
        .headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .ok_or(WechatError::MissingParameter("Host"))?;

    let scheme = parts
        .headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string());

    Ok(format!("{}://{}", scheme, host))
}

/// Layer that prepares an [`AuthorizationSession`](crate::AuthorizationSession)
/// for the handler.
#[derive(Debug, Clone)]
pub struct AuthCallLayer {
    component: Component,
    callback: Arc<CallbackRoute>,
}

impl AuthCallLayer {
    /// `callback_path` is the route WeChat redirects to after authorization
    pub fn new(component: Component, callback_path: impl Into<String>) -> Self {
        Self {
            component,
            callback: Arc::new(CallbackRoute {
                path: callback_path.into(),
                params: Vec::new(),
            }),
        }
    }

    /// Add a callback route parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.callback)
            .params
            .push((name.into(), value.into()));
        self
    }
}

impl<S> Layer<S> for AuthCallLayer {
    type Service = AuthCallService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthCallService {
            inner,
            component: self.component.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthCallService<S> {
    inner: S,
    component: Component,
    callback: Arc<CallbackRoute>,
}

impl<S> Service<Request> for AuthCallService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let component = self.component.clone();
        let callback = Arc::clone(&self.callback);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = handle(&component, &callback, &mut inner, req)
                .await
                .unwrap_or_else(|e| error_response(&e));
            Ok(response)
        })
    }
}

async fn handle<S>(
    component: &Component,
    callback: &CallbackRoute,
    inner: &mut S,
    req: Request,
) -> Result<Response, WechatError>
where
    S: Service<Request, Response = Response, Error = Infallible>,
{
    let (mut parts, body) = req.into_parts();

    let callback_path = callback.expand()?;
    let root = match component.public_root_url() {
        Some(root) => root.to_string(),
        None => request_root(&parts)?,
    };
    let redirect_uri = quote_plus(&format!("{}{}", root, callback_path));

    let pre_auth = component.create_preauthcode().await?;
    let session = component.authorization_session(pre_auth.pre_auth_code, redirect_uri);
    debug!(
        "[WechatComponent] prepared authorization url for callback {}",
        callback_path
    );

    parts.extensions.insert(session);
    Ok(call_inner(inner, Request::from_parts(parts, body)).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str, params: &[(&str, &str)]) -> CallbackRoute {
        CallbackRoute {
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(
            route("/component/callback", &[]).expand().unwrap(),
            "/component/callback"
        );
    }

    #[test]
    fn test_expand_placeholders_and_query() {
        let route = route(
            "/tenants/:tenant/callback/{flow}",
            &[("tenant", "acme corp"), ("flow", "mp"), ("state", "a&b c")],
        );
        assert_eq!(
            route.expand().unwrap(),
            "/tenants/acme%20corp/callback/mp?state=a%26b+c"
        );
    }

    #[test]
    fn test_expand_missing_placeholder() {
        let err = route("/tenants/:tenant/callback", &[]).expand().unwrap_err();
        assert!(matches!(err, WechatError::Config(msg) if msg.contains("tenant")));
    }

    #[test]
    fn test_request_root_from_host_header() {
        let req = Request::builder()
            .uri("/component/authcall")
            .header(HOST, "open.example.com")
            .header(FORWARDED_PROTO, "https")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(request_root(&parts).unwrap(), "https://open.example.com");
    }

    #[test]
    fn test_request_root_defaults_to_http() {
        let req = Request::builder()
            .uri("/component/authcall")
            .header(HOST, "localhost:8080")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(request_root(&parts).unwrap(), "http://localhost:8080");
    }

    #[test]
    fn test_request_root_missing_host() {
        let req = Request::builder()
            .uri("/component/authcall")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert!(matches!(
            request_root(&parts),
            Err(WechatError::MissingParameter("Host"))
        ));
    }
}
