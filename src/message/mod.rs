//! XML message models
//!
//! - [`envelope`] - encrypted outer wrapper
//! - [`component`] - notifications for the component itself
//! - [`incoming`] - pushes for authorized accounts
//! - [`reply`] - passive reply rendering

pub mod component;
pub mod envelope;
pub mod incoming;
pub mod reply;

pub use component::{Authorization, ComponentInfo, ComponentMessage};
pub use envelope::EncryptedEnvelope;
pub use incoming::{IncomingMessage, MessageKind};
pub use reply::{create_reply, TextReply};
