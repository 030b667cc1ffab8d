//! AES-256-CBC payload cipher used by WeChat message encryption
//!
//! Plaintext layout before padding:
//!
//! ```text
//! | 16 random bytes | u32 BE length | message | appid |
//! ```
//!
//! Padding is PKCS#7 over 32-byte blocks, so the cipher itself runs without
//! padding. The IV is the first 16 bytes of the key.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::WechatError;
use crate::types::EncodingAesKey;

type Aes256CbcEncryptor = cbc::Encryptor<Aes256>;
type Aes256CbcDecryptor = cbc::Decryptor<Aes256>;

const PAD_BLOCK_SIZE: usize = 32;
const RANDOM_PREFIX_LEN: usize = 16;
const LENGTH_PREFIX_LEN: usize = 4;

// Keys generated by the open platform do not always have zeroed trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Cipher bound to one 32-byte key
#[derive(Clone)]
pub struct PrpCrypto {
    key: [u8; 32],
}

impl std::fmt::Debug for PrpCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrpCrypto").finish_non_exhaustive()
    }
}

impl PrpCrypto {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Derive the AES key from the 43 character EncodingAESKey
    pub fn from_encoding_aes_key(key: &EncodingAesKey) -> Result<Self, WechatError> {
        let decoded = LENIENT_BASE64
            .decode(format!("{}=", key.as_str()))
            .map_err(|e| WechatError::Crypto(format!("Invalid EncodingAESKey: {}", e)))?;

        let key: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
            WechatError::Crypto(format!(
                "Invalid key length: expected 32, got {}",
                decoded.len()
            ))
        })?;

        Ok(Self::new(key))
    }

    fn iv(&self) -> &[u8] {
        &self.key[..16]
    }

    /// Encrypt `text` for `appid`, returning base64 ciphertext
    pub fn encrypt(&self, text: &str, appid: &str) -> Result<String, WechatError> {
        let prefix: Vec<u8> = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_PREFIX_LEN)
            .collect();
        self.encrypt_with_prefix(&prefix, text, appid)
    }

    pub(crate) fn encrypt_with_prefix(
        &self,
        prefix: &[u8],
        text: &str,
        appid: &str,
    ) -> Result<String, WechatError> {
        let text_len = u32::try_from(text.len())
            .map_err(|_| WechatError::Crypto("Message too large to encrypt".to_string()))?;

        let mut buffer = Vec::with_capacity(
            RANDOM_PREFIX_LEN + LENGTH_PREFIX_LEN + text.len() + appid.len() + PAD_BLOCK_SIZE,
        );
        buffer.extend_from_slice(prefix);
        buffer.extend_from_slice(&text_len.to_be_bytes());
        buffer.extend_from_slice(text.as_bytes());
        buffer.extend_from_slice(appid.as_bytes());
        pkcs7_pad(&mut buffer);

        let encryptor = Aes256CbcEncryptor::new_from_slices(&self.key, self.iv())
            .map_err(|e| WechatError::Crypto(format!("Invalid key or IV: {}", e)))?;

        let msg_len = buffer.len();
        let ciphertext = encryptor
            .encrypt_padded_mut::<NoPadding>(&mut buffer, msg_len)
            .map_err(|e| WechatError::Crypto(format!("Encryption failed: {:?}", e)))?;

        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt base64 ciphertext and check that it was produced for `appid`
    pub fn decrypt(&self, encrypted: &str, appid: &str) -> Result<String, WechatError> {
        let mut buffer = LENIENT_BASE64
            .decode(encrypted.trim())
            .map_err(|e| WechatError::Crypto(format!("Invalid ciphertext: {}", e)))?;

        if buffer.is_empty() || buffer.len() % 16 != 0 {
            return Err(WechatError::Crypto(format!(
                "Invalid ciphertext length: {}",
                buffer.len()
            )));
        }

        let decryptor = Aes256CbcDecryptor::new_from_slices(&self.key, self.iv())
            .map_err(|e| WechatError::Crypto(format!("Invalid key or IV: {}", e)))?;

        let decrypted = decryptor
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .map_err(|e| WechatError::Crypto(format!("Decryption failed: {:?}", e)))?;

        let plain = pkcs7_unpad(decrypted);
        if plain.len() < RANDOM_PREFIX_LEN + LENGTH_PREFIX_LEN {
            return Err(WechatError::Crypto("Decrypted payload too short".to_string()));
        }

        let content = &plain[RANDOM_PREFIX_LEN..];
        let msg_len = u32::from_be_bytes([content[0], content[1], content[2], content[3]]) as usize;
        let body_end = LENGTH_PREFIX_LEN
            .checked_add(msg_len)
            .filter(|end| *end <= content.len())
            .ok_or_else(|| {
                WechatError::Crypto(format!("Declared message length {} out of range", msg_len))
            })?;

        let from_appid = &content[body_end..];
        if from_appid != appid.as_bytes() {
            return Err(WechatError::Crypto(format!(
                "AppId mismatch: expected {}, got {}",
                appid,
                String::from_utf8_lossy(from_appid)
            )));
        }

        String::from_utf8(content[LENGTH_PREFIX_LEN..body_end].to_vec())
            .map_err(|e| WechatError::Crypto(format!("Invalid UTF-8: {}", e)))
    }
}

fn pkcs7_pad(buffer: &mut Vec<u8>) {
    let amount = PAD_BLOCK_SIZE - (buffer.len() % PAD_BLOCK_SIZE);
    buffer.resize(buffer.len() + amount, amount as u8);
}

// An out-of-range pad byte means the sender did not pad; keep everything.
fn pkcs7_unpad(buffer: &[u8]) -> &[u8] {
    let pad = buffer.last().copied().unwrap_or(0) as usize;
    if pad == 0 || pad > PAD_BLOCK_SIZE || pad > buffer.len() {
        return buffer;
    }
    &buffer[..buffer.len() - pad]
}
