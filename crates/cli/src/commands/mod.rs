//! One-shot subcommand implementations.
//!
//! Each command builds on [`CommandContext`], runs its requests to
//! completion, prints, and exits. Failures propagate as `anyhow::Error` and
//! are rendered once by `main`.

pub mod auth;
pub mod clubs;
pub mod events;
pub mod tickets;

use std::sync::Arc;

use anyhow::Result;
use clubhub_api::{ApiClient, SessionManager, SessionStore};

/// Wiring shared by every command: the token store, the request client,
/// and the session manager on top of both.
pub struct CommandContext {
    pub client: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
}

impl CommandContext {
    pub fn new(api_url: String) -> Result<Self> {
        let store = Arc::new(SessionStore::open()?);
        let client = Arc::new(ApiClient::new(api_url, Arc::clone(&store)));
        let session = Arc::new(SessionManager::new(Arc::clone(&client), store));
        Ok(Self { client, session })
    }
}

/// Case-insensitive substring match across a row's searchable fields.
pub(crate) fn matches_search(fields: &[&str], query: &str) -> bool {
    let needle = query.to_lowercase();
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_case_insensitive() {
        assert!(matches_search(&["Programming Club"], "gram"));
        assert!(matches_search(&["Programming Club"], "CLUB"));
        assert!(!matches_search(&["Programming Club"], "chess"));
    }

    #[test]
    fn test_search_spans_all_fields() {
        assert!(matches_search(&["Chess", "weekly blitz nights"], "blitz"));
    }
}
