//! Unified WeChat third-party platform client

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::api::component::{
    AuthorizationInfo, AuthorizerInfoResponse, AuthorizerOptionResponse, AuthorizerTokenResponse,
    ComponentApi, PreAuthCodeResponse,
};
use crate::api::{AuthorizerClient, ComponentContext};
use crate::crypto::MessageCrypto;
use crate::error::WechatError;
use crate::message::{ComponentInfo, ComponentMessage};
use crate::session::SessionStorage;
use crate::token::{session_key, VERIFY_TICKET_KEY};

#[derive(Debug, Clone)]
pub(crate) struct ComponentSettings {
    pub(crate) ticket_ttl: Duration,
    pub(crate) login_page_url: String,
    pub(crate) public_root_url: Option<String>,
}

/// Data needed to send an account owner to the authorization page
///
/// Inserted as a request extension by [`AuthCallLayer`](crate::middleware::AuthCallLayer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationSession {
    pub component_appid: String,
    pub pre_auth_code: String,
    /// Callback URL, already URL-encoded
    pub redirect_uri: String,
    /// Fully composed login page URL
    pub url: String,
}

impl AuthorizationSession {
    pub fn login_url(&self) -> &str {
        &self.url
    }
}

/// Unified WeChat third-party platform client
///
/// Entry point for the crate: holds the component configuration, the
/// message crypto, the session store and the API client.
///
/// # Example
///
/// ```rust,ignore
/// use wechat_component::Component;
/// use wechat_component::types::{AppId, AppSecret, EncodingAesKey, Token};
///
/// let component = Component::builder()
///     .appid(AppId::new("wx1234567890abcdef")?)
///     .secret(AppSecret::new("component_secret")?)
///     .token(Token::new("component_token")?)
///     .encoding_aes_key(EncodingAesKey::new("abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG")?)
///     .build()?;
///
/// let pre_auth = component.create_preauthcode().await?;
/// ```
#[derive(Clone)]
pub struct Component {
    context: Arc<ComponentContext>,
    settings: Arc<ComponentSettings>,
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("appid", self.context.appid())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Component {
    pub fn builder() -> super::builder::ComponentBuilder {
        super::builder::ComponentBuilder::default()
    }

    pub(crate) fn new(context: Arc<ComponentContext>, settings: ComponentSettings) -> Self {
        Self {
            context,
            settings: Arc::new(settings),
        }
    }

    pub fn appid(&self) -> &str {
        self.context.appid().as_str()
    }

    pub fn crypto(&self) -> &MessageCrypto {
        self.context.crypto()
    }

    pub fn session(&self) -> &dyn SessionStorage {
        self.context.session()
    }

    pub fn context(&self) -> &Arc<ComponentContext> {
        &self.context
    }

    pub(crate) fn public_root_url(&self) -> Option<&str> {
        self.settings.public_root_url.as_deref()
    }

    // Verify ticket

    /// How long a pushed verify ticket stays usable
    pub fn ticket_ttl(&self) -> Duration {
        self.settings.ticket_ttl
    }

    pub fn verify_ticket(&self) -> Result<String, WechatError> {
        self.context.token_manager().verify_ticket()
    }

    pub fn cache_verify_ticket(&self, ticket: &str) {
        self.context.session().set(
            &session_key(self.context.appid(), VERIFY_TICKET_KEY),
            ticket.to_string(),
            Some(self.settings.ticket_ttl),
        );
    }

    /// Apply the side effects of a component notification
    pub fn handle_notification(&self, message: &ComponentMessage) {
        match &message.info {
            ComponentInfo::VerifyTicket { verify_ticket } => {
                self.cache_verify_ticket(verify_ticket);
                debug!("[WechatComponent] updated component_verify_ticket");
            }
            ComponentInfo::Unauthorized { authorizer_appid } => {
                self.context.forget_authorizer(authorizer_appid);
                info!("[WechatComponent] authorizer {} revoked authorization", authorizer_appid);
            }
            ComponentInfo::Authorized(auth) | ComponentInfo::UpdateAuthorized(auth) => {
                info!(
                    "[WechatComponent] authorizer {} sent {}",
                    auth.authorizer_appid,
                    message.info_type()
                );
            }
            ComponentInfo::Unknown { info_type } => {
                debug!("[WechatComponent] ignoring InfoType {}", info_type);
            }
        }
    }

    // Component access token

    pub async fn access_token(&self) -> Result<String, WechatError> {
        self.context.token_manager().get_token().await
    }

    pub fn invalidate_token(&self) {
        self.context.token_manager().invalidate();
    }

    // Authorization API

    pub async fn create_preauthcode(&self) -> Result<PreAuthCodeResponse, WechatError> {
        ComponentApi::new(self.context.clone())
            .create_preauthcode()
            .await
    }

    pub async fn query_auth(
        &self,
        authorization_code: &str,
    ) -> Result<AuthorizationInfo, WechatError> {
        ComponentApi::new(self.context.clone())
            .query_auth(authorization_code)
            .await
    }

    pub async fn refresh_authorizer_token(
        &self,
        authorizer_appid: &str,
        authorizer_refresh_token: &str,
    ) -> Result<AuthorizerTokenResponse, WechatError> {
        ComponentApi::new(self.context.clone())
            .refresh_authorizer_token(authorizer_appid, authorizer_refresh_token)
            .await
    }

    pub async fn get_authorizer_info(
        &self,
        authorizer_appid: &str,
    ) -> Result<AuthorizerInfoResponse, WechatError> {
        ComponentApi::new(self.context.clone())
            .get_authorizer_info(authorizer_appid)
            .await
    }

    pub async fn get_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
    ) -> Result<AuthorizerOptionResponse, WechatError> {
        ComponentApi::new(self.context.clone())
            .get_authorizer_option(authorizer_appid, option_name)
            .await
    }

    pub async fn set_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
        option_value: &str,
    ) -> Result<(), WechatError> {
        ComponentApi::new(self.context.clone())
            .set_authorizer_option(authorizer_appid, option_name, option_value)
            .await
    }

    // Authorization flow

    /// Login page URL for an already encoded `redirect_uri`
    pub fn authcall_url(&self, pre_auth_code: &str, redirect_uri: &str) -> String {
        format!(
            "{}?component_appid={}&pre_auth_code={}&redirect_uri={}",
            self.settings.login_page_url,
            self.appid(),
            pre_auth_code,
            redirect_uri
        )
    }

    pub fn authorization_session(
        &self,
        pre_auth_code: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> AuthorizationSession {
        let pre_auth_code = pre_auth_code.into();
        let redirect_uri = redirect_uri.into();
        AuthorizationSession {
            component_appid: self.appid().to_string(),
            url: self.authcall_url(&pre_auth_code, &redirect_uri),
            pre_auth_code,
            redirect_uri,
        }
    }

    /// Exchange an authorization code and keep the authorizer's tokens
    pub async fn get_client_by_authorization_code(
        &self,
        authorization_code: &str,
    ) -> Result<AuthorizerClient, WechatError> {
        let info = self.query_auth(authorization_code).await?;
        self.context.store_authorizer_tokens(
            &info.authorizer_appid,
            &info.authorizer_access_token,
            &info.authorizer_refresh_token,
            info.expires_in,
        );
        info!(
            "[WechatComponent] authorizer {} authorized the component",
            info.authorizer_appid
        );
        Ok(AuthorizerClient::new(
            self.context.clone(),
            info.authorizer_appid,
        ))
    }

    /// Client for an authorizer whose tokens are already stored
    ///
    /// # Errors
    /// Returns `WechatError::Token` if no refresh token is stored for the
    /// appid, or the refresh error when the access token had expired.
    pub async fn get_client_by_appid(
        &self,
        authorizer_appid: &str,
    ) -> Result<AuthorizerClient, WechatError> {
        if self
            .context
            .authorizer_refresh_token(authorizer_appid)
            .is_none()
        {
            return Err(WechatError::Token(format!(
                "no refresh token stored for authorizer {}",
                authorizer_appid
            )));
        }

        let client = AuthorizerClient::new(self.context.clone(), authorizer_appid);
        client.access_token().await?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Authorization;
    use crate::types::{AppId, AppSecret, EncodingAesKey, Token};

    fn component() -> Component {
        Component::builder()
            .appid(AppId::new("wx1234567890abcdef").unwrap())
            .secret(AppSecret::new("secret1234567890ab").unwrap())
            .token(Token::new("component_token").unwrap())
            .encoding_aes_key(
                EncodingAesKey::new("abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG").unwrap(),
            )
            .build()
            .unwrap()
    }

    fn message(info: ComponentInfo) -> ComponentMessage {
        ComponentMessage {
            appid: "wx1234567890abcdef".to_string(),
            create_time: 1413192605,
            info,
        }
    }

    #[test]
    fn test_authcall_url() {
        let url = component().authcall_url("preauthcode@@@abc", "https%3A%2F%2Fexample.com%2Fcb");
        assert_eq!(
            url,
            "https://mp.weixin.qq.com/cgi-bin/componentloginpage?component_appid=wx1234567890abcdef&pre_auth_code=preauthcode@@@abc&redirect_uri=https%3A%2F%2Fexample.com%2Fcb"
        );
    }

    #[test]
    fn test_authorization_session() {
        let session = component().authorization_session("code", "cb");
        assert_eq!(session.component_appid, "wx1234567890abcdef");
        assert_eq!(session.pre_auth_code, "code");
        assert_eq!(session.redirect_uri, "cb");
        assert!(session.url.ends_with("pre_auth_code=code&redirect_uri=cb"));
    }

    #[test]
    fn test_verify_ticket_notification_updates_cache() {
        let component = component();
        assert!(matches!(
            component.verify_ticket(),
            Err(WechatError::MissingTicket)
        ));

        component.handle_notification(&message(ComponentInfo::VerifyTicket {
            verify_ticket: "ticket@@@1".to_string(),
        }));
        assert_eq!(component.verify_ticket().unwrap(), "ticket@@@1");

        component.handle_notification(&message(ComponentInfo::VerifyTicket {
            verify_ticket: "ticket@@@2".to_string(),
        }));
        assert_eq!(component.verify_ticket().unwrap(), "ticket@@@2");
    }

    #[test]
    fn test_unauthorized_notification_drops_tokens() {
        let component = component();
        component.context().store_authorizer_tokens(
            "wxaaaaaaaaaaaaaaaa",
            "access",
            "refresh",
            7200,
        );
        component.handle_notification(&message(ComponentInfo::Unauthorized {
            authorizer_appid: "wxaaaaaaaaaaaaaaaa".to_string(),
        }));
        assert!(component
            .context()
            .authorizer_access_token("wxaaaaaaaaaaaaaaaa")
            .is_none());
        assert!(component
            .context()
            .authorizer_refresh_token("wxaaaaaaaaaaaaaaaa")
            .is_none());
    }

    #[test]
    fn test_authorized_notification_stores_nothing() {
        let component = component();
        component.handle_notification(&message(ComponentInfo::Authorized(Authorization {
            authorizer_appid: "wxaaaaaaaaaaaaaaaa".to_string(),
            authorization_code: "code".to_string(),
            authorization_code_expired_time: 0,
            pre_auth_code: None,
        })));
        assert!(component
            .context()
            .authorizer_refresh_token("wxaaaaaaaaaaaaaaaa")
            .is_none());
    }

    #[tokio::test]
    async fn test_get_client_by_appid_without_tokens() {
        let result = component().get_client_by_appid("wxaaaaaaaaaaaaaaaa").await;
        assert!(matches!(result, Err(WechatError::Token(_))));
    }

    #[tokio::test]
    async fn test_get_client_by_appid_uses_cached_token() {
        let component = component();
        component.context().store_authorizer_tokens(
            "wxaaaaaaaaaaaaaaaa",
            "authorizer_access",
            "authorizer_refresh",
            7200,
        );
        let client = component
            .get_client_by_appid("wxaaaaaaaaaaaaaaaa")
            .await
            .unwrap();
        assert_eq!(client.appid(), "wxaaaaaaaaaaaaaaaa");
        assert_eq!(client.access_token().await.unwrap(), "authorizer_access");
    }
}
