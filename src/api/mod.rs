//! WeChat third-party platform API modules
//!
//! - [`component`] - Authorization calls made with the component_access_token
//! - [`authorizer`] - Calls made on behalf of an authorized account
//! - [`context`] - Shared client, crypto and session state

pub mod authorizer;
pub mod component;
pub mod context;

pub use authorizer::AuthorizerClient;
pub use component::{
    AuthorizationInfo, AuthorizerInfo, AuthorizerInfoResponse, AuthorizerOptionResponse,
    AuthorizerTokenResponse, ComponentApi, FuncInfo, FuncScopeCategory, PreAuthCodeResponse,
};
pub use context::ComponentContext;
