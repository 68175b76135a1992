//! Shared application state.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::Notifier;
use crate::tokens::TokenSigner;

/// Application state shared across all request handlers.
///
/// Wraps the inner state in an `Arc` so cloning per-request is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenSigner,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Assemble the application state.
    ///
    /// The token signer is derived from the configured JWT secret; the
    /// notifier is injected so tests can substitute a recording fake.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        let tokens = TokenSigner::new(config.jwt_secret.expose_secret().as_bytes());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                notifier,
            }),
        }
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Token signer for sessions and reset tokens.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Notification delivery channel.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }
}
