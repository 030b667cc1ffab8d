use std::sync::Arc;

use thiserror::Error;

/// Transport-level failures when talking to the WeChat API
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Reqwest(Arc<reqwest::Error>),

    #[error("response decode failed: {0}")]
    Decode(String),
}

/// WeChat component error types
#[derive(Debug, Error)]
pub enum WechatError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("WeChat API error (code={code}): {message}")]
    Api { code: i32, message: String },

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("component_verify_ticket is not available yet")]
    MissingTicket,

    #[error("Missing request parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Handler response error: {0}")]
    Handler(String),
}

impl From<reqwest::Error> for WechatError {
    fn from(e: reqwest::Error) -> Self {
        WechatError::Http(HttpError::Reqwest(Arc::new(e)))
    }
}

impl From<quick_xml::de::DeError> for WechatError {
    fn from(e: quick_xml::de::DeError) -> Self {
        WechatError::Xml(e.to_string())
    }
}

impl WechatError {
    /// Turn a WeChat `errcode`/`errmsg` pair into a result.
    pub fn check_api(errcode: i32, errmsg: &str) -> Result<(), WechatError> {
        if errcode == 0 {
            return Ok(());
        }
        Err(WechatError::Api {
            code: errcode,
            message: errmsg.to_string(),
        })
    }

    /// Whether the failure is worth retrying: connect failures, timeouts
    /// and 5xx answers.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            WechatError::Http(HttpError::Reqwest(e)) => {
                e.is_connect()
                    || e.is_timeout()
                    || e.status().is_some_and(|status| status.is_server_error())
            }
            _ => false,
        }
    }
}
