//! Full-screen browser over the campus API.
//!
//! The shell in [`app`] owns the terminal and all view state; [`data`]
//! runs every request as a background task and reports back over a
//! channel, so drawing never waits on the network.

mod app;
mod data;

use std::sync::Arc;

use anyhow::Result;
use clubhub_api::{ApiClient, QueryCache, SessionManager};
use tokio::sync::mpsc;

use app::App;
use data::Fetcher;

/// Run the browser until the user quits.
pub async fn run(client: Arc<ApiClient>, session: Arc<SessionManager>) -> Result<()> {
    let cache = Arc::new(QueryCache::new());
    let (tx, rx) = mpsc::channel(64);
    let fetcher = Fetcher::new(client, Arc::clone(&session), Arc::clone(&cache), tx);

    let mut app = App::new(fetcher, session, cache, rx);
    app.run()?;
    Ok(())
}
