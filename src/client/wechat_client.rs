//! JSON transport for the open platform APIs
//!
//! Every call goes through [`WechatClient::execute`], which logs the request
//! with credentials masked, rejects non-2xx statuses and turns a non-zero
//! `errcode` into [`WechatError::Api`].

use std::time::{Duration, Instant};

use log::{debug, warn};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{HttpError, WechatError};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.weixin.qq.com";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const MASK: &str = "***";

/// Query parameters never written to the log
const CREDENTIAL_PARAMS: &[&str] = &[
    "access_token",
    "component_access_token",
    "authorizer_access_token",
    "component_appsecret",
    "secret",
];

/// Status fields shared by every open platform response
#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// HTTP client for `api.weixin.qq.com`
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct WechatClient {
    http: Client,
    base_url: String,
}

impl WechatClient {
    pub fn builder() -> WechatClientBuilder {
        WechatClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append `name=token` to `path`, percent-encoding the token
    pub(crate) fn append_token(path: &str, name: &str, token: &str) -> String {
        let encoded = utf8_percent_encode(token, NON_ALPHANUMERIC);
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{path}{separator}{name}={encoded}")
    }

    /// Copy of `url` safe to log
    pub(crate) fn masked_url(url: &Url) -> String {
        if url.query().is_none() {
            return url.to_string();
        }

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| {
                let value = if CREDENTIAL_PARAMS
                    .iter()
                    .any(|name| key.eq_ignore_ascii_case(name))
                {
                    MASK.to_string()
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();

        let mut masked = url.clone();
        masked.query_pairs_mut().clear().extend_pairs(pairs);
        masked.to_string()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T, WechatError> {
        let method = request.method().clone();
        let logged_url = Self::masked_url(request.url());
        debug!("[WechatComponent] >>> {} {}", method, logged_url);

        let started = Instant::now();
        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!(
            "[WechatComponent] <<< {} {} ({:?})",
            status.as_u16(),
            logged_url,
            started.elapsed()
        );

        if let Err(e) = response.error_for_status_ref() {
            warn!("[WechatComponent] {} {} failed: {}", method, logged_url, e);
            return Err(e.into());
        }

        let value: serde_json::Value = response.json().await?;
        let api_status = ApiStatus::deserialize(&value).unwrap_or_default();
        if api_status.errcode != 0 {
            warn!(
                "[WechatComponent] {} answered errcode={} errmsg={}",
                logged_url, api_status.errcode, api_status.errmsg
            );
            let code = i32::try_from(api_status.errcode).unwrap_or(i32::MAX);
            WechatError::check_api(code, &api_status.errmsg)?;
        }

        serde_json::from_value(value)
            .map_err(|e| WechatError::Http(HttpError::Decode(e.to_string())))
    }

    /// GET `path` with `query` appended
    ///
    /// # Errors
    /// `WechatError::Http` for transport, status or decode failures and
    /// `WechatError::Api` when WeChat answers a non-zero errcode.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WechatError> {
        let request = self.http.get(self.url(path)).query(query).build()?;
        self.execute(request).await
    }

    /// POST `body` as JSON to `path`
    ///
    /// `path` carries the token query parameter, see `append_token`.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WechatError> {
        let request = self.http.post(self.url(path)).json(body).build()?;
        self.execute(request).await
    }
}

#[derive(Debug, Default)]
pub struct WechatClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl WechatClientBuilder {
    /// Default: `https://api.weixin.qq.com`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Total request timeout, 30 seconds by default
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Connect timeout, 10 seconds by default
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<WechatClient, WechatError> {
        let base_url = match self.base_url {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url,
            Some(url) => {
                return Err(WechatError::Config(format!(
                    "base_url must start with http:// or https://, got: {}",
                    url
                )))
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        let http = Client::builder()
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            )
            .connect_timeout(
                self.connect_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            )
            .build()?;

        Ok(WechatClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}
