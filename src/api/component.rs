//! Third-party platform authorization API
//!
//! Calls under `/cgi-bin/component/` authenticated with the
//! component_access_token.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::context::ComponentContext;
use crate::client::WechatClient;
use crate::error::WechatError;

/// Response from api_create_preauthcode
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreAuthCodeResponse {
    pub pre_auth_code: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FuncScopeCategory {
    pub id: i64,
}

/// One permission set granted to the component
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FuncInfo {
    pub funcscope_category: FuncScopeCategory,
}

/// Authorization details for one authorizer
///
/// Token fields are empty when returned by api_get_authorizer_info.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizationInfo {
    pub authorizer_appid: String,
    #[serde(default)]
    pub authorizer_access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub authorizer_refresh_token: String,
    #[serde(default)]
    pub func_info: Vec<FuncInfo>,
}

#[derive(Debug, Deserialize)]
struct QueryAuthResponse {
    authorization_info: AuthorizationInfo,
}

/// Response from api_authorizer_token
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizerTokenResponse {
    pub authorizer_access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub authorizer_refresh_token: String,
}

/// Public profile of an authorizer account
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizerInfo {
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub head_img: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub principal_name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub qrcode_url: String,
    /// Remaining fields (service type, verify type, business info, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response from api_get_authorizer_info
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizerInfoResponse {
    pub authorizer_info: AuthorizerInfo,
    pub authorization_info: AuthorizationInfo,
}

/// Response from api_get_authorizer_option
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizerOptionResponse {
    pub authorizer_appid: String,
    pub option_name: String,
    pub option_value: String,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

/// WeChat component authorization API
pub struct ComponentApi {
    context: Arc<ComponentContext>,
}

impl ComponentApi {
    /// Create a new ComponentApi instance
    pub fn new(context: Arc<ComponentContext>) -> Self {
        Self { context }
    }

    async fn post_with_token<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WechatError> {
        let token = self.context.token_manager.get_token().await?;
        let path = WechatClient::append_token(path, "component_access_token", &token);
        self.context.client.post(&path, body).await
    }

    /// Request a one-time pre-auth code
    ///
    /// POST /cgi-bin/component/api_create_preauthcode
    pub async fn create_preauthcode(&self) -> Result<PreAuthCodeResponse, WechatError> {
        let body = serde_json::json!({
            "component_appid": self.context.appid.as_str(),
        });
        self.post_with_token("/cgi-bin/component/api_create_preauthcode", &body)
            .await
    }

    /// Exchange an authorization code for authorizer tokens
    ///
    /// POST /cgi-bin/component/api_query_auth
    pub async fn query_auth(
        &self,
        authorization_code: &str,
    ) -> Result<AuthorizationInfo, WechatError> {
        let body = serde_json::json!({
            "component_appid": self.context.appid.as_str(),
            "authorization_code": authorization_code,
        });
        let response: QueryAuthResponse = self
            .post_with_token("/cgi-bin/component/api_query_auth", &body)
            .await?;
        Ok(response.authorization_info)
    }

    /// Refresh an authorizer's access token
    ///
    /// POST /cgi-bin/component/api_authorizer_token
    pub async fn refresh_authorizer_token(
        &self,
        authorizer_appid: &str,
        authorizer_refresh_token: &str,
    ) -> Result<AuthorizerTokenResponse, WechatError> {
        let body = serde_json::json!({
            "component_appid": self.context.appid.as_str(),
            "authorizer_appid": authorizer_appid,
            "authorizer_refresh_token": authorizer_refresh_token,
        });
        self.post_with_token("/cgi-bin/component/api_authorizer_token", &body)
            .await
    }

    /// POST /cgi-bin/component/api_get_authorizer_info
    pub async fn get_authorizer_info(
        &self,
        authorizer_appid: &str,
    ) -> Result<AuthorizerInfoResponse, WechatError> {
        let body = serde_json::json!({
            "component_appid": self.context.appid.as_str(),
            "authorizer_appid": authorizer_appid,
        });
        self.post_with_token("/cgi-bin/component/api_get_authorizer_info", &body)
            .await
    }

    /// POST /cgi-bin/component/api_get_authorizer_option
    pub async fn get_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
    ) -> Result<AuthorizerOptionResponse, WechatError> {
        let body = serde_json::json!({
            "component_appid": self.context.appid.as_str(),
            "authorizer_appid": authorizer_appid,
            "option_name": option_name,
        });
        self.post_with_token("/cgi-bin/component/api_get_authorizer_option", &body)
            .await
    }

    /// POST /cgi-bin/component/api_set_authorizer_option
    pub async fn set_authorizer_option(
        &self,
        authorizer_appid: &str,
        option_name: &str,
        option_value: &str,
    ) -> Result<(), WechatError> {
        let body = serde_json::json!({
            "component_appid": self.context.appid.as_str(),
            "authorizer_appid": authorizer_appid,
            "option_name": option_name,
            "option_value": option_value,
        });
        let _: EmptyResponse = self
            .post_with_token("/cgi-bin/component/api_set_authorizer_option", &body)
            .await?;
        Ok(())
    }
}
