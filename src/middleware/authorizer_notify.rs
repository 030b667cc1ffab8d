//! Authorizer message endpoint.
//!
//! Messages and events sent to an authorized account are forwarded to the
//! component's "message and event URL", usually routed as `/notify/:appid`.
//! The handler returns plain text; it is sent back as an encrypted text reply.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use log::{debug, warn};
use tower::{Layer, Service};

use super::{call_inner, error_response, path_param, query_params, read_text};
use crate::client::Component;
use crate::error::WechatError;
use crate::message::{create_reply, IncomingMessage};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Layer that decrypts authorizer messages and encrypts the handler's reply.
///
/// The handler receives the [`IncomingMessage`] and an
/// [`AuthorizerClient`](crate::AuthorizerClient) as extensions. An empty
/// body answers `success`, meaning "no reply".
#[derive(Debug, Clone)]
pub struct AuthorizerNotifyLayer {
    component: Component,
}

impl AuthorizerNotifyLayer {
    pub fn new(component: Component) -> Self {
        Self { component }
    }
}

impl<S> Layer<S> for AuthorizerNotifyLayer {
    type Service = AuthorizerNotifyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizerNotifyService {
            inner,
            component: self.component.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizerNotifyService<S> {
    inner: S,
    component: Component,
}

impl<S> Service<Request> for AuthorizerNotifyService<S>
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
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = handle(&component, &mut inner, req)
                .await
                .unwrap_or_else(|e| error_response(&e));
            Ok(response)
        })
    }
}

fn required(
    query: &mut HashMap<String, String>,
    name: &'static str,
) -> Result<String, WechatError> {
    query
        .remove(name)
        .filter(|value| !value.is_empty())
        .ok_or(WechatError::MissingParameter(name))
}

async fn handle<S>(
    component: &Component,
    inner: &mut S,
    req: Request,
) -> Result<Response, WechatError>
where
    S: Service<Request, Response = Response, Error = Infallible>,
{
    let (mut parts, body) = req.into_parts();

    let mut query = query_params(&parts.uri);
    let msg_signature = required(&mut query, "msg_signature")?;
    let timestamp = required(&mut query, "timestamp")?;
    let nonce = required(&mut query, "nonce")?;
    let appid = match path_param(&mut parts, "appid").await {
        Some(appid) => appid,
        None => required(&mut query, "appid")?,
    };

    let body = read_text(body).await?;
    let xml = component
        .crypto()
        .decrypt_message(&body, &msg_signature, &timestamp, &nonce)?;
    let message = IncomingMessage::parse(&xml)?;
    debug!(
        "[WechatComponent] authorizer {} sent {} message",
        appid,
        message.msg_type()
    );

    let client = component.get_client_by_appid(&appid).await?;

    parts.extensions.insert(message.clone());
    parts.extensions.insert(client);
    let response = call_inner(inner, Request::from_parts(parts, Body::from(body))).await;

    if !response.status().is_success() {
        warn!(
            "[WechatComponent] authorizer {} handler answered {}",
            appid,
            response.status()
        );
        return Ok(response);
    }

    let text = read_text(response.into_body())
        .await
        .map_err(|e| WechatError::Handler(e.to_string()))?;
    let reply = create_reply(&text, &message);
    if reply.is_empty() {
        return Ok("success".into_response());
    }

    let encrypted = component
        .crypto()
        .encrypt_message(&reply, Some(&nonce), Some(&timestamp))?;
    Ok(([(CONTENT_TYPE, XML_CONTENT_TYPE)], encrypted).into_response())
}
