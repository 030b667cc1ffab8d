//! Notifications pushed to the component's authorization event URL

use serde::Deserialize;

use crate::error::WechatError;

pub const INFO_TYPE_VERIFY_TICKET: &str = "component_verify_ticket";
pub const INFO_TYPE_UNAUTHORIZED: &str = "unauthorized";
pub const INFO_TYPE_AUTHORIZED: &str = "authorized";
pub const INFO_TYPE_UPDATE_AUTHORIZED: &str = "updateauthorized";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawComponentMessage {
    app_id: Option<String>,
    create_time: Option<i64>,
    info_type: Option<String>,
    component_verify_ticket: Option<String>,
    authorizer_appid: Option<String>,
    authorization_code: Option<String>,
    authorization_code_expired_time: Option<i64>,
    pre_auth_code: Option<String>,
}

/// Authorization grant carried by `authorized` and `updateauthorized` pushes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorizer_appid: String,
    pub authorization_code: String,
    pub authorization_code_expired_time: i64,
    pub pre_auth_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentInfo {
    VerifyTicket { verify_ticket: String },
    Unauthorized { authorizer_appid: String },
    Authorized(Authorization),
    UpdateAuthorized(Authorization),
    Unknown { info_type: String },
}

/// Decrypted component notification, classified by `InfoType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMessage {
    pub appid: String,
    pub create_time: i64,
    pub info: ComponentInfo,
}

impl ComponentMessage {
    pub fn parse(xml: &str) -> Result<Self, WechatError> {
        let raw: RawComponentMessage = quick_xml::de::from_str(xml)?;
        let info_type = raw
            .info_type
            .ok_or_else(|| WechatError::Xml("missing InfoType".to_string()))?;

        let info = match info_type.as_str() {
            INFO_TYPE_VERIFY_TICKET => ComponentInfo::VerifyTicket {
                verify_ticket: required(raw.component_verify_ticket, "ComponentVerifyTicket")?,
            },
            INFO_TYPE_UNAUTHORIZED => ComponentInfo::Unauthorized {
                authorizer_appid: required(raw.authorizer_appid, "AuthorizerAppid")?,
            },
            INFO_TYPE_AUTHORIZED | INFO_TYPE_UPDATE_AUTHORIZED => {
                let authorization = Authorization {
                    authorizer_appid: required(raw.authorizer_appid, "AuthorizerAppid")?,
                    authorization_code: required(raw.authorization_code, "AuthorizationCode")?,
                    authorization_code_expired_time: raw
                        .authorization_code_expired_time
                        .unwrap_or_default(),
                    pre_auth_code: raw.pre_auth_code,
                };
                if info_type == INFO_TYPE_AUTHORIZED {
                    ComponentInfo::Authorized(authorization)
                } else {
                    ComponentInfo::UpdateAuthorized(authorization)
                }
            }
            _ => ComponentInfo::Unknown { info_type },
        };

        Ok(Self {
            appid: raw.app_id.unwrap_or_default(),
            create_time: raw.create_time.unwrap_or_default(),
            info,
        })
    }

    pub fn info_type(&self) -> &str {
        match &self.info {
            ComponentInfo::VerifyTicket { .. } => INFO_TYPE_VERIFY_TICKET,
            ComponentInfo::Unauthorized { .. } => INFO_TYPE_UNAUTHORIZED,
            ComponentInfo::Authorized(_) => INFO_TYPE_AUTHORIZED,
            ComponentInfo::UpdateAuthorized(_) => INFO_TYPE_UPDATE_AUTHORIZED,
            ComponentInfo::Unknown { info_type } => info_type,
        }
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, WechatError> {
    value.ok_or_else(|| WechatError::Xml(format!("missing {}", field)))
}
