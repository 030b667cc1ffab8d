//! Component access token management
//!
//! The component access token is derived from the latest verify ticket, so
//! it can only be fetched once WeChat has pushed a ticket. Tokens live in the
//! session store and refreshes are serialized.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::WechatClient;
use crate::error::WechatError;
use crate::session::SessionStorage;
use crate::types::{AccessToken, AppId, AppSecret};
use crate::utils::jittered_delay;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;

pub(crate) const VERIFY_TICKET_KEY: &str = "component_verify_ticket";
const ACCESS_TOKEN_KEY: &str = "component_access_token";

/// Session key scoped to one component
pub(crate) fn session_key(appid: &AppId, name: &str) -> String {
    format!("{}_{}", appid.as_str(), name)
}

/// Expiry to store for a token WeChat says is valid for `expires_in` seconds
pub(crate) fn token_ttl(expires_in: u64, buffer: Duration) -> Duration {
    Duration::from_secs(expires_in).saturating_sub(buffer)
}

#[derive(Debug, Serialize)]
struct ComponentTokenRequest<'a> {
    component_appid: &'a str,
    component_appsecret: &'a str,
    component_verify_ticket: &'a str,
}

#[derive(Debug, Deserialize)]
struct ComponentTokenResponse {
    component_access_token: String,
    expires_in: u64,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

/// Manages the component_access_token lifecycle with automatic refresh
pub struct TokenManager {
    client: WechatClient,
    appid: AppId,
    secret: AppSecret,
    session: Arc<dyn SessionStorage>,
    refresh_lock: Mutex<()>,
    refresh_buffer: Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("appid", &self.appid)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(
        client: WechatClient,
        appid: AppId,
        secret: AppSecret,
        session: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            client,
            appid,
            secret,
            session,
            refresh_lock: Mutex::new(()),
            refresh_buffer: Duration::from_secs(5 * 60),
        }
    }

    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    fn token_key(&self) -> String {
        session_key(&self.appid, ACCESS_TOKEN_KEY)
    }

    pub fn verify_ticket(&self) -> Result<String, WechatError> {
        self.session
            .get(&session_key(&self.appid, VERIFY_TICKET_KEY))
            .ok_or(WechatError::MissingTicket)
    }

    pub async fn get_token(&self) -> Result<String, WechatError> {
        if let Some(token) = self.session.get(&self.token_key()) {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.session.get(&self.token_key()) {
            return Ok(token);
        }

        let ticket = self.verify_ticket()?;
        let response = self.fetch_token_with_retry(&ticket).await?;
        let token =
            AccessToken::new(response.component_access_token).map_err(WechatError::Token)?;

        self.session.set(
            &self.token_key(),
            token.as_str().to_string(),
            Some(token_ttl(response.expires_in, self.refresh_buffer)),
        );
        debug!(
            "[WechatComponent] refreshed component_access_token, expires_in={}",
            response.expires_in
        );

        Ok(token.as_str().to_string())
    }

    async fn fetch_token_with_retry(
        &self,
        ticket: &str,
    ) -> Result<ComponentTokenResponse, WechatError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.fetch_token(ticket).await {
                Ok(response) => {
                    WechatError::check_api(response.errcode, &response.errmsg)?;
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        "[WechatComponent] component token fetch attempt {} failed: {}",
                        attempt + 1,
                        e
                    );
                    last_error = Some(e);
                    if attempt < MAX_RETRIES - 1 {
                        tokio::time::sleep(jittered_delay(RETRY_DELAY_MS, attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| WechatError::Token("Unknown error".to_string())))
    }

    async fn fetch_token(&self, ticket: &str) -> Result<ComponentTokenResponse, WechatError> {
        let body = ComponentTokenRequest {
            component_appid: self.appid.as_str(),
            component_appsecret: self.secret.as_str(),
            component_verify_ticket: ticket,
        };
        self.client
            .post("/cgi-bin/component/api_component_token", &body)
            .await
    }

    pub fn invalidate(&self) {
        self.session.delete(&self.token_key());
    }
}
