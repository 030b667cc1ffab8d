//! Shared context for component API implementations

use std::sync::Arc;

use crate::client::WechatClient;
use crate::crypto::MessageCrypto;
use crate::session::SessionStorage;
use crate::token::{session_key, token_ttl, TokenManager};
use crate::types::{AppId, AppSecret};

/// Context holding shared resources for component API implementations.
///
/// Contains the HTTP client, the component appid, the message crypto
/// and the session store that holds tickets and tokens.
pub struct ComponentContext {
    pub(crate) client: WechatClient,
    pub(crate) appid: AppId,
    pub(crate) crypto: MessageCrypto,
    pub(crate) session: Arc<dyn SessionStorage>,
    pub(crate) token_manager: TokenManager,
}

impl std::fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContext")
            .field("appid", &self.appid)
            .field("client", &self.client)
            .field("token_manager", &"TokenManager { .. }")
            .finish_non_exhaustive()
    }
}

impl ComponentContext {
    pub fn new(
        client: WechatClient,
        appid: AppId,
        secret: AppSecret,
        crypto: MessageCrypto,
        session: Arc<dyn SessionStorage>,
    ) -> Self {
        let token_manager = TokenManager::new(
            client.clone(),
            appid.clone(),
            secret,
            Arc::clone(&session),
        );
        Self {
            client,
            appid,
            crypto,
            session,
            token_manager,
        }
    }

    pub fn client(&self) -> &WechatClient {
        &self.client
    }

    pub fn appid(&self) -> &AppId {
        &self.appid
    }

    pub fn crypto(&self) -> &MessageCrypto {
        &self.crypto
    }

    pub fn session(&self) -> &dyn SessionStorage {
        self.session.as_ref()
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    fn authorizer_key(&self, authorizer_appid: &str, name: &str) -> String {
        session_key(&self.appid, &format!("{}_{}", authorizer_appid, name))
    }

    pub(crate) fn authorizer_access_token(&self, authorizer_appid: &str) -> Option<String> {
        self.session
            .get(&self.authorizer_key(authorizer_appid, "access_token"))
    }

    pub(crate) fn authorizer_refresh_token(&self, authorizer_appid: &str) -> Option<String> {
        self.session
            .get(&self.authorizer_key(authorizer_appid, "refresh_token"))
    }

    pub(crate) fn store_authorizer_tokens(
        &self,
        authorizer_appid: &str,
        access_token: &str,
        refresh_token: &str,
        expires_in: u64,
    ) {
        let ttl = token_ttl(expires_in, self.token_manager.refresh_buffer());
        self.session.set(
            &self.authorizer_key(authorizer_appid, "access_token"),
            access_token.to_string(),
            Some(ttl),
        );
        if !refresh_token.is_empty() {
            self.session.set(
                &self.authorizer_key(authorizer_appid, "refresh_token"),
                refresh_token.to_string(),
                None,
            );
        }
    }

    pub(crate) fn forget_authorizer(&self, authorizer_appid: &str) {
        self.session
            .delete(&self.authorizer_key(authorizer_appid, "access_token"));
        self.session
            .delete(&self.authorizer_key(authorizer_appid, "refresh_token"));
    }
}
