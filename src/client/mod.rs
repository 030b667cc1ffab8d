//! WeChat HTTP Client module
//!
//! This module contains the WechatClient transport and the Component facade.

mod wechat_client;
pub use wechat_client::{WechatClient, WechatClientBuilder};

mod component;
pub use component::{AuthorizationSession, Component};

mod builder;
pub use builder::ComponentBuilder;
