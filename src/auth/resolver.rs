//! Token resolution and forced logout.

use std::sync::Arc;

use crate::auth::navigator::Navigator;
use crate::auth::store::{KeyValueStore, StorageScope};
use crate::config::AuthConfig;

/// Reads bearer tokens from storage and tears the session down on 401.
#[derive(Clone)]
pub struct AuthResolver {
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    token_slots: Vec<String>,
    session_record_slot: String,
    login_path: String,
}

impl AuthResolver {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            navigator,
            token_slots: config
                .token_slots
                .iter()
                .filter(|slot| !slot.is_empty())
                .cloned()
                .collect(),
            session_record_slot: config.session_record_slot.clone(),
            login_path: config.login_path.clone(),
        }
    }

    /// First non-empty token: every slot of the durable scope, then every
    /// slot of the session scope.
    pub fn resolve_token(&self) -> Option<String> {
        StorageScope::ORDERED.iter().find_map(|&scope| {
            self.token_slots.iter().find_map(|slot| {
                self.store
                    .get(scope, slot)
                    .filter(|token| !token.is_empty())
            })
        })
    }

    /// Clear the session and send the user to the login page.
    ///
    /// Returns whether a redirect was issued; none is issued when the current
    /// location is already under the login path.
    pub fn handle_unauthorized(&self) -> bool {
        self.clear_session();

        let current = self.navigator.current_path();
        if self.is_under_login(&current) {
            tracing::debug!(current = %current, "Already on login path, redirect suppressed");
            return false;
        }

        tracing::warn!(from = %current, to = %self.login_path, "Unauthorized, redirecting to login");
        self.navigator.navigate(&self.login_path);
        true
    }

    /// Remove every credential slot and the cached session record from both scopes.
    pub fn clear_session(&self) {
        for scope in StorageScope::ORDERED {
            for slot in &self.token_slots {
                self.store.remove(scope, slot);
            }
            self.store.remove(scope, &self.session_record_slot);
        }
    }

    /// Persist a token in the primary slot of the durable scope.
    pub fn store_token(&self, token: &str) {
        match self.token_slots.first() {
            Some(slot) => self.store.set(StorageScope::Durable, slot, token),
            None => tracing::warn!("No token slot configured, token not stored"),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    fn is_under_login(&self, path: &str) -> bool {
        match path.strip_prefix(self.login_path.as_str()) {
            Some(rest) => {
                rest.is_empty()
                    || self.login_path.ends_with('/')
                    || rest.starts_with(|c: char| matches!(c, '/' | '?' | '#'))
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AuthResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResolver")
            .field("token_slots", &self.token_slots)
            .field("login_path", &self.login_path)
            .finish()
    }
}
