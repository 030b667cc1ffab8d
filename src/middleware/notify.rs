//! Component notification endpoint.
//!
//! WeChat pushes the verify ticket (every ten minutes) and authorization
//! changes to the component's "authorization event URL". The body is
//! `<xml><AppId/><Encrypt/></xml>` and WeChat expects the literal `success`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use log::{debug, warn};
use tower::{Layer, Service};

use super::{call_inner, error_response, query_params, read_text};
use crate::client::Component;
use crate::error::WechatError;
use crate::message::{ComponentMessage, EncryptedEnvelope};

const SUCCESS: &str = "success";
const FAIL: &str = "fail";

/// Layer that decrypts component notifications before the handler runs.
///
/// The handler receives the [`ComponentMessage`] as an extension. Its body
/// is mapped to `success` when empty or `success` (any case) and to `fail`
/// otherwise.
#[derive(Debug, Clone)]
pub struct ComponentNotifyLayer {
    component: Component,
}

impl ComponentNotifyLayer {
    pub fn new(component: Component) -> Self {
        Self { component }
    }
}

impl<S> Layer<S> for ComponentNotifyLayer {
    type Service = ComponentNotifyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ComponentNotifyService {
            inner,
            component: self.component.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentNotifyService<S> {
    inner: S,
    component: Component,
}

impl<S> Service<Request> for ComponentNotifyService<S>
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
            debug!("[WechatComponent] component notify called");
            let response = handle(&component, &mut inner, req)
                .await
                .unwrap_or_else(|e| error_response(&e));
            Ok(response)
        })
    }
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
    let body = read_text(body).await?;
    let envelope = EncryptedEnvelope::parse(&body)?;

    if envelope.app_id.as_deref() != Some(component.appid()) {
        warn!(
            "[WechatComponent] notify for unexpected appid {:?}",
            envelope.app_id
        );
        return Ok(FAIL.into_response());
    }

    let query = query_params(&parts.uri);
    match (
        query.get("msg_signature"),
        query.get("timestamp"),
        query.get("nonce"),
    ) {
        (Some(signature), Some(timestamp), Some(nonce)) => {
            if let Err(e) =
                component
                    .crypto()
                    .check_signature(signature, timestamp, nonce, &envelope.encrypt)
            {
                warn!("[WechatComponent] notify rejected: {}", e);
                return Ok(FAIL.into_response());
            }
        }
        (None, None, None) => {}
        _ => {
            warn!("[WechatComponent] notify rejected: incomplete signature parameters");
            return Ok(FAIL.into_response());
        }
    }

    let xml = component.crypto().decrypt(&envelope.encrypt)?;
    let message = ComponentMessage::parse(&xml)?;
    debug!(
        "[WechatComponent] received component message {}",
        message.info_type()
    );
    component.handle_notification(&message);

    parts.extensions.insert(message);
    let response = call_inner(inner, Request::from_parts(parts, Body::from(body))).await;

    let succeeded = response.status().is_success();
    let text = match read_text(response.into_body()).await {
        Ok(text) => text,
        Err(e) => {
            warn!("[WechatComponent] unreadable notify handler body: {}", e);
            return Ok(FAIL.into_response());
        }
    };
    if !succeeded || !(text.is_empty() || text.eq_ignore_ascii_case(SUCCESS)) {
        return Ok(FAIL.into_response());
    }
    Ok(SUCCESS.into_response())
}
