//! WeChat message encryption
//!
//! Pushes to a third-party platform are encrypted with AES-256-CBC using the
//! EncodingAESKey configured on the open platform, and signed with SHA-1 over
//! the verification token, timestamp, nonce and ciphertext.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechat_component::crypto::MessageCrypto;
//!
//! let crypto = MessageCrypto::new(token, &encoding_aes_key, component_appid)?;
//! let xml = crypto.decrypt_message(&body, &msg_signature, &timestamp, &nonce)?;
//! let reply = crypto.encrypt_message("<xml>...</xml>", Some(&nonce), Some(&timestamp))?;
//! ```

pub mod message;
pub mod prp;

pub use message::{signature, MessageCrypto};
pub use prp::PrpCrypto;
