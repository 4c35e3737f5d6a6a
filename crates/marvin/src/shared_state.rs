//! Application state shared by every handler
//!
//! Clients are built once at startup and handed to the router; handlers only
//! ever clone the `Arc`s.

use std::sync::Arc;
use tracing::info;

use crate::auth::{Authenticator, StaticTokenAuthenticator, SupabaseAuthenticator};
use crate::completion::{CompletionBackend, OpenAiClient};
use crate::config::{BackendMode, Config};
use crate::store::{InMemoryStore, SessionStore, SupabaseStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SessionStore>,
    pub auth: Arc<dyn Authenticator>,
    pub completion: Arc<dyn CompletionBackend>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        auth: Arc<dyn Authenticator>,
        completion: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            auth,
            completion,
        }
    }

    /// Wire up the clients the configuration asks for.
    pub fn from_config(config: Config) -> Self {
        let timeout = config.upstream_timeout();

        let (store, auth): (Arc<dyn SessionStore>, Arc<dyn Authenticator>) = match config.backend {
            BackendMode::Supabase => {
                info!("Using Supabase backend at {}", config.supabase_url);
                (
                    Arc::new(SupabaseStore::new(
                        &config.supabase_url,
                        &config.supabase_service_role_key,
                        timeout,
                    )),
                    Arc::new(SupabaseAuthenticator::new(
                        &config.supabase_url,
                        &config.supabase_anon_key,
                        timeout,
                    )),
                )
            }
            BackendMode::Memory => {
                info!(
                    "Using in-memory backend with {} dev token(s)",
                    config.dev_tokens.len()
                );
                let auth = config
                    .dev_tokens
                    .iter()
                    .fold(StaticTokenAuthenticator::new(), |auth, (token, user_id)| {
                        auth.with_user(token.as_str(), user_id.as_str())
                    });
                (Arc::new(InMemoryStore::new()), Arc::new(auth))
            }
        };

        let completion: Arc<dyn CompletionBackend> = Arc::new(OpenAiClient::new(
            &config.openai_api_base,
            &config.openai_api_key,
            &config.embedding_model,
            timeout,
        ));

        Self::new(config, store, auth, completion)
    }
}
