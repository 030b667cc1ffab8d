//! Signed and encrypted message envelopes

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::{Digest, Sha1};

use super::prp::PrpCrypto;
use crate::error::WechatError;
use crate::message::reply::unix_now;
use crate::message::EncryptedEnvelope;
use crate::types::{AppId, EncodingAesKey, Token};

const NONCE_LEN: usize = 16;

/// Hex SHA-1 over the sorted concatenation of the four inputs
pub fn signature(token: &str, timestamp: &str, nonce: &str, encrypt: &str) -> String {
    let mut parts = [token, timestamp, nonce, encrypt];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Message crypto bound to the component's token, key and appid
#[derive(Debug, Clone)]
pub struct MessageCrypto {
    token: Token,
    appid: AppId,
    prp: PrpCrypto,
}

impl MessageCrypto {
    pub fn new(
        token: Token,
        encoding_aes_key: &EncodingAesKey,
        appid: AppId,
    ) -> Result<Self, WechatError> {
        Ok(Self {
            token,
            appid,
            prp: PrpCrypto::from_encoding_aes_key(encoding_aes_key)?,
        })
    }

    pub fn appid(&self) -> &AppId {
        &self.appid
    }

    /// Decrypt a raw `Encrypt` value without signature checks
    pub fn decrypt(&self, encrypted: &str) -> Result<String, WechatError> {
        self.prp.decrypt(encrypted, self.appid.as_str())
    }

    pub fn check_signature(
        &self,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
        encrypt: &str,
    ) -> Result<(), WechatError> {
        let expected = signature(self.token.as_str(), timestamp, nonce, encrypt);
        if expected != msg_signature {
            return Err(WechatError::Signature(
                "msg_signature does not match payload".to_string(),
            ));
        }
        Ok(())
    }

    /// Verify and decrypt an inbound envelope, returning the inner XML
    pub fn decrypt_message(
        &self,
        xml: &str,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, WechatError> {
        let envelope = EncryptedEnvelope::parse(xml)?;
        self.check_signature(msg_signature, timestamp, nonce, &envelope.encrypt)?;
        self.decrypt(&envelope.encrypt)
    }

    /// Encrypt a reply into a signed envelope.
    ///
    /// Missing `nonce` or `timestamp` are generated.
    pub fn encrypt_message(
        &self,
        reply: &str,
        nonce: Option<&str>,
        timestamp: Option<&str>,
    ) -> Result<String, WechatError> {
        let nonce = nonce.map(str::to_string).unwrap_or_else(random_nonce);
        let timestamp = timestamp
            .map(str::to_string)
            .unwrap_or_else(|| unix_now().to_string());

        let encrypt = self.prp.encrypt(reply, self.appid.as_str())?;
        let msg_signature = signature(self.token.as_str(), &timestamp, &nonce, &encrypt);

        Ok(EncryptedEnvelope::render(
            &encrypt,
            &msg_signature,
            &timestamp,
            &nonce,
        ))
    }
}

fn random_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> MessageCrypto {
        MessageCrypto::new(
            Token::new("component_token").unwrap(),
            &EncodingAesKey::new("abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG").unwrap(),
            AppId::new("wx1234567890abcdef").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = signature("token", "1409304348", "xxxxxx", "encrypted");
        let b = signature("encrypted", "xxxxxx", "token", "1409304348");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn test_signature_known_value() {
        // sha1("123") with the parts already sorted
        assert_eq!(
            signature("1", "2", "3", ""),
            "40bd001563085fc35165329ea1ff5c5ecbdbbeef"
        );
    }

    #[test]
    fn test_encrypt_message_keeps_nonce_and_timestamp() {
        let crypto = crypto();
        let xml = crypto
            .encrypt_message("<xml></xml>", Some("nonce123"), Some("1409304348"))
            .unwrap();
        let envelope = EncryptedEnvelope::parse(&xml).unwrap();
        assert_eq!(envelope.nonce.as_deref(), Some("nonce123"));
        assert_eq!(envelope.timestamp.as_deref(), Some("1409304348"));
        assert_eq!(
            envelope.msg_signature.as_deref(),
            Some(signature("component_token", "1409304348", "nonce123", &envelope.encrypt).as_str())
        );
    }

    #[test]
    fn test_encrypt_message_generates_nonce() {
        let xml = crypto().encrypt_message("reply", None, None).unwrap();
        let envelope = EncryptedEnvelope::parse(&xml).unwrap();
        assert_eq!(envelope.nonce.map(|n| n.len()), Some(NONCE_LEN));
        assert!(envelope.timestamp.is_some());
    }

    #[test]
    fn test_decrypt_message_rejects_bad_signature() {
        let crypto = crypto();
        let xml = crypto
            .encrypt_message("reply", Some("nonce"), Some("1"))
            .unwrap();
        let result = crypto.decrypt_message(&xml, "0000", "1", "nonce");
        assert!(matches!(result, Err(WechatError::Signature(_))));
    }

    #[test]
    fn test_decrypt_message_accepts_own_envelope() {
        let crypto = crypto();
        let xml = crypto
            .encrypt_message("<xml><Content>hi</Content></xml>", Some("nonce"), Some("1"))
            .unwrap();
        let envelope = EncryptedEnvelope::parse(&xml).unwrap();
        let signature = envelope.msg_signature.unwrap();
        let plain = crypto.decrypt_message(&xml, &signature, "1", "nonce").unwrap();
        assert_eq!(plain, "<xml><Content>hi</Content></xml>");
    }
}
