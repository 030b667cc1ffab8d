//! Authorization callback endpoint.
//!
//! WeChat redirects the account owner here with `auth_code` after the
//! authorization page is confirmed.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};

use super::{call_inner, error_response, query_params};
use crate::client::Component;
use crate::error::WechatError;

/// Layer that exchanges `auth_code` for an
/// [`AuthorizerClient`](crate::AuthorizerClient) extension.
#[derive(Debug, Clone)]
pub struct AuthCallbackLayer {
    component: Component,
}

impl AuthCallbackLayer {
    pub fn new(component: Component) -> Self {
        Self { component }
    }
}

impl<S> Layer<S> for AuthCallbackLayer {
    type Service = AuthCallbackService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthCallbackService {
            inner,
            component: self.component.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthCallbackService<S> {
    inner: S,
    component: Component,
}

impl<S> Service<Request> for AuthCallbackService<S>
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

async fn handle<S>(
    component: &Component,
    inner: &mut S,
    req: Request,
) -> Result<Response, WechatError>
where
    S: Service<Request, Response = Response, Error = Infallible>,
{
    let (mut parts, body) = req.into_parts();
    let auth_code = query_params(&parts.uri)
        .remove("auth_code")
        .filter(|code| !code.is_empty())
        .ok_or(WechatError::MissingParameter("auth_code"))?;

    let client = component.get_client_by_authorization_code(&auth_code).await?;
    parts.extensions.insert(client);

    Ok(call_inner(inner, Request::from_parts(parts, body)).await)
}
