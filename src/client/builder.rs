use std::sync::Arc;
use std::time::Duration;

use crate::api::ComponentContext;
use crate::crypto::MessageCrypto;
use crate::error::WechatError;
use crate::session::{MemoryStorage, SessionStorage};
use crate::types::{AppId, AppSecret, EncodingAesKey, Token};

use super::component::{Component, ComponentSettings};
use super::wechat_client::WechatClient;

pub(crate) const DEFAULT_TICKET_TTL_SECS: u64 = 600;
pub(crate) const DEFAULT_LOGIN_PAGE_URL: &str = "https://mp.weixin.qq.com/cgi-bin/componentloginpage";

#[must_use]
#[derive(Default)]
pub struct ComponentBuilder {
    appid: Option<AppId>,
    secret: Option<AppSecret>,
    token: Option<Token>,
    encoding_aes_key: Option<EncodingAesKey>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    session: Option<Arc<dyn SessionStorage>>,
    ticket_ttl: Option<Duration>,
    login_page_url: Option<String>,
    public_root_url: Option<String>,
}

impl std::fmt::Debug for ComponentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentBuilder")
            .field("appid", &self.appid)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("session", &self.session.as_ref().map(|_| ".."))
            .field("ticket_ttl", &self.ticket_ttl)
            .field("public_root_url", &self.public_root_url)
            .finish_non_exhaustive()
    }
}

impl ComponentBuilder {
    /// Set the component AppID
    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    /// Set the component AppSecret
    pub fn secret(mut self, secret: AppSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Set the message verification token
    pub fn token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the message EncodingAESKey
    pub fn encoding_aes_key(mut self, key: EncodingAesKey) -> Self {
        self.encoding_aes_key = Some(key);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Use a shared session store instead of the in-process default
    pub fn session(mut self, session: Arc<dyn SessionStorage>) -> Self {
        self.session = Some(session);
        self
    }

    /// How long a pushed verify ticket stays cached
    ///
    /// Default: 600 seconds
    pub fn ticket_ttl(mut self, ttl: Duration) -> Self {
        self.ticket_ttl = Some(ttl);
        self
    }

    pub fn login_page_url(mut self, url: impl Into<String>) -> Self {
        self.login_page_url = Some(url.into());
        self
    }

    /// External root (scheme and host) used for authorization callbacks.
    ///
    /// Without it the root is taken from the incoming request.
    pub fn public_root_url(mut self, url: impl Into<String>) -> Self {
        self.public_root_url = Some(url.into());
        self
    }

    pub fn build(self) -> Result<Component, WechatError> {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;
        let secret = self
            .secret
            .ok_or_else(|| WechatError::Config("secret is required".to_string()))?;
        let token = self
            .token
            .ok_or_else(|| WechatError::Config("token is required".to_string()))?;
        let encoding_aes_key = self
            .encoding_aes_key
            .ok_or_else(|| WechatError::Config("encoding_aes_key is required".to_string()))?;

        if let Some(root) = &self.public_root_url {
            if !root.starts_with("http://") && !root.starts_with("https://") {
                return Err(WechatError::Config(format!(
                    "public_root_url must start with http:// or https://, got: {}",
                    root
                )));
            }
        }

        let mut client = WechatClient::builder();
        if let Some(base_url) = self.base_url {
            client = client.base_url(base_url);
        }
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            client = client.connect_timeout(connect_timeout);
        }
        let client = client.build()?;

        let crypto = MessageCrypto::new(token, &encoding_aes_key, appid.clone())?;
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let settings = ComponentSettings {
            ticket_ttl: self
                .ticket_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_TICKET_TTL_SECS)),
            login_page_url: self
                .login_page_url
                .unwrap_or_else(|| DEFAULT_LOGIN_PAGE_URL.to_string()),
            public_root_url: self
                .public_root_url
                .map(|root| root.trim_end_matches('/').to_string()),
        };

        let context = Arc::new(ComponentContext::new(
            client, appid, secret, crypto, session,
        ));

        Ok(Component::new(context, settings))
    }
}
