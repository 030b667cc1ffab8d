//! Messages and events pushed on behalf of an authorizer

use serde::Deserialize;

use crate::error::WechatError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMessage {
    to_user_name: Option<String>,
    from_user_name: Option<String>,
    create_time: Option<i64>,
    msg_type: Option<String>,
    msg_id: Option<u64>,
    content: Option<String>,
    pic_url: Option<String>,
    media_id: Option<String>,
    format: Option<String>,
    recognition: Option<String>,
    thumb_media_id: Option<String>,
    #[serde(rename = "Location_X")]
    location_x: Option<f64>,
    #[serde(rename = "Location_Y")]
    location_y: Option<f64>,
    scale: Option<i32>,
    label: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    event: Option<String>,
    event_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Text {
        content: String,
    },
    Image {
        pic_url: String,
        media_id: String,
    },
    Voice {
        media_id: String,
        format: String,
        recognition: Option<String>,
    },
    Video {
        media_id: String,
        thumb_media_id: String,
    },
    ShortVideo {
        media_id: String,
        thumb_media_id: String,
    },
    Location {
        location_x: f64,
        location_y: f64,
        scale: i32,
        label: String,
    },
    Link {
        title: String,
        description: String,
        url: String,
    },
    /// `event` is lowercased
    Event {
        event: String,
        event_key: Option<String>,
    },
    Unknown {
        msg_type: String,
    },
}

/// Decrypted push for an authorizer account
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// Account that received the message (the authorizer)
    pub to_user_name: String,
    /// User who sent the message
    pub from_user_name: String,
    pub create_time: i64,
    pub msg_id: Option<u64>,
    pub kind: MessageKind,
}

impl IncomingMessage {
    pub fn parse(xml: &str) -> Result<Self, WechatError> {
        let raw: RawMessage = quick_xml::de::from_str(xml)?;

        let to_user_name = raw
            .to_user_name
            .ok_or_else(|| WechatError::Xml("missing ToUserName".to_string()))?;
        let from_user_name = raw
            .from_user_name
            .ok_or_else(|| WechatError::Xml("missing FromUserName".to_string()))?;
        let msg_type = raw.msg_type.unwrap_or_default().to_lowercase();

        let kind = match msg_type.as_str() {
            "text" => MessageKind::Text {
                content: raw.content.unwrap_or_default(),
            },
            "image" => MessageKind::Image {
                pic_url: raw.pic_url.unwrap_or_default(),
                media_id: raw.media_id.unwrap_or_default(),
            },
            "voice" => MessageKind::Voice {
                media_id: raw.media_id.unwrap_or_default(),
                format: raw.format.unwrap_or_default(),
                recognition: raw.recognition,
            },
            "video" => MessageKind::Video {
                media_id: raw.media_id.unwrap_or_default(),
                thumb_media_id: raw.thumb_media_id.unwrap_or_default(),
            },
            "shortvideo" => MessageKind::ShortVideo {
                media_id: raw.media_id.unwrap_or_default(),
                thumb_media_id: raw.thumb_media_id.unwrap_or_default(),
            },
            "location" => MessageKind::Location {
                location_x: raw.location_x.unwrap_or_default(),
                location_y: raw.location_y.unwrap_or_default(),
                scale: raw.scale.unwrap_or_default(),
                label: raw.label.unwrap_or_default(),
            },
            "link" => MessageKind::Link {
                title: raw.title.unwrap_or_default(),
                description: raw.description.unwrap_or_default(),
                url: raw.url.unwrap_or_default(),
            },
            "event" => MessageKind::Event {
                event: raw.event.unwrap_or_default().to_lowercase(),
                event_key: raw.event_key,
            },
            _ => MessageKind::Unknown { msg_type },
        };

        Ok(Self {
            to_user_name,
            from_user_name,
            create_time: raw.create_time.unwrap_or_default(),
            msg_id: raw.msg_id,
            kind,
        })
    }

    pub fn msg_type(&self) -> &str {
        match &self.kind {
            MessageKind::Text { .. } => "text",
            MessageKind::Image { .. } => "image",
            MessageKind::Voice { .. } => "voice",
            MessageKind::Video { .. } => "video",
            MessageKind::ShortVideo { .. } => "shortvideo",
            MessageKind::Location { .. } => "location",
            MessageKind::Link { .. } => "link",
            MessageKind::Event { .. } => "event",
            MessageKind::Unknown { msg_type } => msg_type,
        }
    }

    /// Text content, only present for text messages
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Text { content } => Some(content),
            _ => None,
        }
    }

    pub fn source(&self) -> &str {
        &self.from_user_name
    }

    pub fn target(&self) -> &str {
        &self.to_user_name
    }
}
