//! WeChat third-party platform (component) SDK for Rust
//!
//! Receives the component's webhook traffic and drives the authorization
//! handshake with authorized official accounts and mini programs.
//!
//! ## Endpoints
//!
//! | Layer | WeChat URL setting | Handler gets |
//! |-------|--------------------|--------------|
//! | [`middleware::ComponentNotifyLayer`] | Authorization event URL | [`message::ComponentMessage`] |
//! | [`middleware::AuthCallLayer`] | (your own entry page) | [`AuthorizationSession`] |
//! | [`middleware::AuthCallbackLayer`] | Authorization callback | [`AuthorizerClient`] |
//! | [`middleware::AuthorizerNotifyLayer`] | Message and event URL | [`message::IncomingMessage`], [`AuthorizerClient`] |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{routing::post, Extension, Router};
//! use wechat_component::message::IncomingMessage;
//! use wechat_component::middleware::{AuthorizerNotifyLayer, ComponentNotifyLayer};
//! use wechat_component::types::{AppId, AppSecret, EncodingAesKey, Token};
//! use wechat_component::Component;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let component = Component::builder()
//!         .appid(AppId::new("wx1234567890abcdef")?)
//!         .secret(AppSecret::new("your_secret")?)
//!         .token(Token::new("your_token")?)
//!         .encoding_aes_key(EncodingAesKey::new("abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG")?)
//!         .build()?;
//!
//!     let app = Router::new()
//!         .route(
//!             "/component/notify",
//!             post(|| async { "success" }).layer(ComponentNotifyLayer::new(component.clone())),
//!         )
//!         .route(
//!             "/notify/:appid",
//!             post(|Extension(msg): Extension<IncomingMessage>| async move {
//!                 msg.content().unwrap_or_default().to_string()
//!             })
//!             .layer(AuthorizerNotifyLayer::new(component.clone())),
//!         );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Component and authorizer API calls
//! - [`client`] - HTTP transport and the [`Component`] entry point
//! - [`crypto`] - Message signature and AES encryption
//! - [`message`] - XML message models and replies
//! - [`middleware`] - Tower layers for the webhook endpoints
//! - [`session`] - Ticket and token storage
//! - [`token`] - Component access token management (internal, for advanced users)
//! - [`types`] - Validated configuration values
//!
//! ## Error Handling
//!
//! Every fallible call returns [`WechatError`]:
//!
//! ```rust,ignore
//! use wechat_component::WechatError;
//!
//! match component.create_preauthcode().await {
//!     Ok(code) => println!("{}", code.pre_auth_code),
//!     Err(WechatError::MissingTicket) => eprintln!("no verify ticket pushed yet"),
//!     Err(WechatError::Api { code, message }) => eprintln!("API error: {} - {}", code, message),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

pub mod api;
pub mod client;
pub mod crypto;
pub mod error;
pub mod message;
pub mod middleware;
pub mod session;
pub mod token;
pub mod types;
mod utils;

pub use api::AuthorizerClient;
pub use client::{AuthorizationSession, Component, ComponentBuilder, WechatClient, WechatClientBuilder};
pub use error::WechatError;
pub use session::{MemoryStorage, SessionStorage};
