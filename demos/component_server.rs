//! Third-party platform webhook server
//!
//! Run with:
//!
//! ```text
//! COMPONENT_APPID=wx... COMPONENT_SECRET=... COMPONENT_TOKEN=... \
//! COMPONENT_ENCODING_AES_KEY=... cargo run --example component_server
//! ```
//!
//! Configure the open platform with:
//! - authorization event URL: `http://<host>/component/notify`
//! - message and event URL: `http://<host>/notify/$APPID$`

use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Extension, Router};
use wechat_component::message::{ComponentInfo, ComponentMessage, IncomingMessage};
use wechat_component::middleware::{
    AuthCallLayer, AuthCallbackLayer, AuthorizerNotifyLayer, ComponentNotifyLayer,
};
use wechat_component::types::{AppId, AppSecret, EncodingAesKey, Token};
use wechat_component::{AuthorizationSession, AuthorizerClient, Component};

fn env(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    std::env::var(name).map_err(|_| format!("{name} is not set").into())
}

async fn component_notify(Extension(message): Extension<ComponentMessage>) -> &'static str {
    match message.info {
        ComponentInfo::VerifyTicket { .. } => println!("Verify ticket refreshed"),
        ComponentInfo::Authorized(auth) => println!("Authorized by {}", auth.authorizer_appid),
        ComponentInfo::Unauthorized { authorizer_appid } => {
            println!("Authorization revoked by {authorizer_appid}")
        }
        other => println!("Notification: {other:?}"),
    }
    "success"
}

async fn authcall(Extension(auth): Extension<AuthorizationSession>) -> Redirect {
    Redirect::to(auth.login_url())
}

async fn callback(Extension(client): Extension<AuthorizerClient>) -> String {
    format!("Authorized account {}", client.appid())
}

async fn authorizer_notify(Extension(message): Extension<IncomingMessage>) -> String {
    match message.content() {
        Some(content) => format!("You said: {content}"),
        None => String::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let component = Component::builder()
        .appid(AppId::new(env("COMPONENT_APPID")?)?)
        .secret(AppSecret::new(env("COMPONENT_SECRET")?)?)
        .token(Token::new(env("COMPONENT_TOKEN")?)?)
        .encoding_aes_key(EncodingAesKey::new(env("COMPONENT_ENCODING_AES_KEY")?)?)
        .build()?;

    let app = Router::new()
        .route(
            "/component/notify",
            post(component_notify).layer(ComponentNotifyLayer::new(component.clone())),
        )
        .route(
            "/component/authcall",
            get(authcall).layer(AuthCallLayer::new(component.clone(), "/component/callback")),
        )
        .route(
            "/component/callback",
            get(callback).layer(AuthCallbackLayer::new(component.clone())),
        )
        .route(
            "/notify/:appid",
            post(authorizer_notify).layer(AuthorizerNotifyLayer::new(component.clone())),
        );

    println!("Component {} listening on 0.0.0.0:8080", component.appid());
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    axum::serve(listener, app).await?;

    Ok(())
}
