use serde::Deserialize;

use crate::error::WechatError;

/// Outer XML wrapper around an encrypted payload
///
/// Component notifications carry `AppId`, authorizer pushes carry
/// `ToUserName`, and encrypted replies carry the signature fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptedEnvelope {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub to_user_name: Option<String>,
    pub encrypt: String,
    #[serde(default)]
    pub msg_signature: Option<String>,
    #[serde(default, rename = "TimeStamp")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl EncryptedEnvelope {
    pub fn parse(xml: &str) -> Result<Self, WechatError> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub(crate) fn render(encrypt: &str, signature: &str, timestamp: &str, nonce: &str) -> String {
        format!(
            "<xml>\n\
             <Encrypt><![CDATA[{encrypt}]]></Encrypt>\n\
             <MsgSignature><![CDATA[{signature}]]></MsgSignature>\n\
             <TimeStamp>{timestamp}</TimeStamp>\n\
             <Nonce><![CDATA[{nonce}]]></Nonce>\n\
             </xml>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_component_envelope() {
        let xml = "<xml>\
            <AppId><![CDATA[wx1234567890abcdef]]></AppId>\
            <Encrypt><![CDATA[c2VjcmV0]]></Encrypt>\
            </xml>";
        let envelope = EncryptedEnvelope::parse(xml).unwrap();
        assert_eq!(envelope.app_id.as_deref(), Some("wx1234567890abcdef"));
        assert_eq!(envelope.encrypt, "c2VjcmV0");
        assert!(envelope.to_user_name.is_none());
    }

    #[test]
    fn test_parse_rendered_reply() {
        let xml = EncryptedEnvelope::render("c2VjcmV0", "abc123", "1409304348", "xxxxxx");
        let envelope = EncryptedEnvelope::parse(&xml).unwrap();
        assert_eq!(envelope.encrypt, "c2VjcmV0");
        assert_eq!(envelope.msg_signature.as_deref(), Some("abc123"));
        assert_eq!(envelope.timestamp.as_deref(), Some("1409304348"));
        assert_eq!(envelope.nonce.as_deref(), Some("xxxxxx"));
    }

    #[test]
    fn test_parse_missing_encrypt() {
        let xml = "<xml><AppId>wx1234567890abcdef</AppId></xml>";
        assert!(matches!(
            EncryptedEnvelope::parse(xml),
            Err(WechatError::Xml(_))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(EncryptedEnvelope::parse("<xml><Encrypt>abc</xml>").is_err());
    }
}
