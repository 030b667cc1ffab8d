//! API access on behalf of an authorizer account

use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::component::ComponentApi;
use crate::api::context::ComponentContext;
use crate::client::WechatClient;
use crate::error::WechatError;

/// Client bound to one authorizer appid
///
/// The authorizer access token is read from the session store and
/// refreshed through the stored refresh token once it expires.
#[derive(Clone)]
pub struct AuthorizerClient {
    context: Arc<ComponentContext>,
    appid: String,
}

impl std::fmt::Debug for AuthorizerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizerClient")
            .field("appid", &self.appid)
            .finish_non_exhaustive()
    }
}

impl AuthorizerClient {
    pub(crate) fn new(context: Arc<ComponentContext>, appid: impl Into<String>) -> Self {
        Self {
            context,
            appid: appid.into(),
        }
    }

    pub fn appid(&self) -> &str {
        &self.appid
    }

    pub async fn access_token(&self) -> Result<String, WechatError> {
        if let Some(token) = self.context.authorizer_access_token(&self.appid) {
            return Ok(token);
        }

        let refresh_token = self
            .context
            .authorizer_refresh_token(&self.appid)
            .ok_or_else(|| {
                WechatError::Token(format!(
                    "no refresh token stored for authorizer {}",
                    self.appid
                ))
            })?;

        let response = ComponentApi::new(Arc::clone(&self.context))
            .refresh_authorizer_token(&self.appid, &refresh_token)
            .await?;

        let next_refresh = if response.authorizer_refresh_token.is_empty() {
            refresh_token.as_str()
        } else {
            response.authorizer_refresh_token.as_str()
        };
        self.context.store_authorizer_tokens(
            &self.appid,
            &response.authorizer_access_token,
            next_refresh,
            response.expires_in,
        );
        debug!(
            "[WechatComponent] refreshed authorizer_access_token for {}",
            self.appid
        );

        Ok(response.authorizer_access_token)
    }

    /// GET an authorizer API, adding `access_token` to the query
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WechatError> {
        let token = self.access_token().await?;
        let mut params = Vec::with_capacity(query.len() + 1);
        params.extend_from_slice(query);
        params.push(("access_token", token.as_str()));
        self.context.client.get(path, &params).await
    }

    /// POST JSON to an authorizer API, adding `access_token` to the query
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WechatError> {
        let token = self.access_token().await?;
        let path = WechatClient::append_token(path, "access_token", &token);
        self.context.client.post(&path, body).await
    }
}
