//! Passive replies to authorizer pushes

use std::time::{SystemTime, UNIX_EPOCH};

use super::incoming::IncomingMessage;

/// Text reply addressed back to the sender of an [`IncomingMessage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub to_user_name: String,
    pub from_user_name: String,
    pub create_time: i64,
    pub content: String,
}

impl TextReply {
    pub fn to(message: &IncomingMessage, content: impl Into<String>) -> Self {
        Self {
            to_user_name: message.source().to_string(),
            from_user_name: message.target().to_string(),
            create_time: unix_now(),
            content: content.into(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "<xml>\n\
             <ToUserName>{}</ToUserName>\n\
             <FromUserName>{}</FromUserName>\n\
             <CreateTime>{}</CreateTime>\n\
             <MsgType><![CDATA[text]]></MsgType>\n\
             <Content>{}</Content>\n\
             </xml>",
            cdata(&self.to_user_name),
            cdata(&self.from_user_name),
            self.create_time,
            cdata(&self.content),
        )
    }
}

/// Render the reply body for a handler's text.
///
/// Empty text produces an empty body, which WeChat treats as "no reply".
pub fn create_reply(content: &str, message: &IncomingMessage) -> String {
    if content.is_empty() {
        return String::new();
    }
    TextReply::to(message, content).render()
}

fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
