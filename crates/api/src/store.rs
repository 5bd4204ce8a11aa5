use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{config_dir, ConfigError};

/// The persisted token pair, the entire on-disk footprint of a session.
///
/// The refresh token is stored when the server issues one but this client
/// never uses it to renew an expired access token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Persistent storage for the session token pair, backed by `session.toml`
/// in the config directory.
///
/// Shared as an `Arc` between the session manager (writes on login/logout)
/// and the request client (reads per request, purges on 401). Writes update
/// memory first and persist best-effort: a disk failure is logged and the
/// in-memory session keeps working for the life of the process.
pub struct SessionStore {
    path: PathBuf,
    tokens: RwLock<StoredTokens>,
}

impl SessionStore {
    /// Open the store at the default location (`<config dir>/session.toml`).
    pub fn open() -> Result<Self, ConfigError> {
        Ok(Self::load(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("session.toml"))
    }

    /// Load the store from `path`. A missing file starts an empty session;
    /// a corrupt file is discarded with a warning rather than failing the
    /// program.
    pub fn load(path: PathBuf) -> Self {
        let tokens = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<StoredTokens>(&content) {
                Ok(tokens) => tokens,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "corrupt session file, starting empty");
                    StoredTokens::default()
                }
            },
            Err(_) => StoredTokens::default(),
        };

        Self {
            path,
            tokens: RwLock::new(tokens),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.read().refresh_token.clone()
    }

    /// Store a token pair and persist it.
    pub fn set_tokens(&self, access: String, refresh: Option<String>) {
        let mut tokens = self.tokens.write();
        tokens.access_token = Some(access);
        tokens.refresh_token = refresh;
        self.persist(&tokens);
    }

    /// Drop both tokens and persist the empty pair. Always succeeds locally.
    pub fn clear(&self) {
        let mut tokens = self.tokens.write();
        *tokens = StoredTokens::default();
        self.persist(&tokens);
    }

    fn persist(&self, tokens: &StoredTokens) {
        let result = toml::to_string_pretty(tokens)
            .map_err(std::io::Error::other)
            .and_then(|content| std::fs::write(&self.path, content));
        if let Err(err) = result {
            tracing::warn!(path = %self.path.display(), %err, "failed to persist session file");
        }
    }
}
