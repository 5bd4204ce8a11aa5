//! Background data loading for the browse shell.
//!
//! Every network operation runs as an independent tokio task and reports
//! back over an mpsc channel as a [`FetchResult`], so the UI loop never
//! blocks on the network. Query fetches go through the shared
//! [`QueryCache`]: overlapping requests for one key collapse into a single
//! task, and resolved data is kept for instant redisplay.

use std::future::Future;
use std::sync::Arc;

use clubhub_api::{
    ApiClient, ApiError, Club, ClubMember, Event, EventReview, QueryCache, RegisterStudent,
    SessionManager, Student, Subscription, Ticket,
};
use serde::Serialize;
use tokio::sync::mpsc;

/// Lifecycle of one dataset as a view sees it.
pub enum QueryState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState::Idle
    }
}

/// Outcome of a background task, delivered to the UI loop over the channel.
/// Detail variants carry the id they were fetched for so stale responses
/// can be told apart after navigation.
pub enum FetchResult {
    Session(Option<Student>),
    LoggedIn(Result<Student, ApiError>),
    Registered(Result<Student, ApiError>),
    User(Result<Student, ApiError>),
    Events(Result<Vec<Event>, ApiError>),
    Upcoming(Result<Vec<Event>, ApiError>),
    EventDetail(i64, Result<Event, ApiError>),
    EventReviews(i64, Result<Vec<EventReview>, ApiError>),
    ReviewPosted(i64, Result<EventReview, ApiError>),
    Clubs(Result<Vec<Club>, ApiError>),
    ClubDetail(i64, Result<Club, ApiError>),
    ClubEvents(i64, Result<Vec<Event>, ApiError>),
    ClubMembers(i64, Result<Vec<ClubMember>, ApiError>),
    Joined(i64, Result<ClubMember, ApiError>),
    Subscribed(i64, Result<Subscription, ApiError>),
    Tickets(Result<Vec<Ticket>, ApiError>),
    Purchased(Result<Ticket, ApiError>),
    Cancelled(i64, Result<(), ApiError>),
    Memberships(Result<Vec<ClubMember>, ApiError>),
    Subscriptions(Result<Vec<Subscription>, ApiError>),
}

/// Handle the shell uses to start background work.
///
/// `load_*` methods fetch a dataset under a cache key; the rest are
/// mutations and always run. None of them block, and none report directly:
/// results arrive through the channel as [`FetchResult`]s.
pub struct Fetcher {
    client: Arc<ApiClient>,
    session: Arc<SessionManager>,
    cache: Arc<QueryCache>,
    tx: mpsc::Sender<FetchResult>,
}

impl Fetcher {
    pub fn new(
        client: Arc<ApiClient>,
        session: Arc<SessionManager>,
        cache: Arc<QueryCache>,
        tx: mpsc::Sender<FetchResult>,
    ) -> Self {
        Self {
            client,
            session,
            cache,
            tx,
        }
    }

    /// Probe the stored session once. Sends [`FetchResult::Session`] with
    /// the rehydrated user, or `None` when no usable session exists.
    pub fn initialize_session(&self) {
        let session = Arc::clone(&self.session);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            session.initialize().await;
            let _ = tx.send(FetchResult::Session(session.current_user())).await;
        });
    }

    pub fn login(&self, username: String, password: String) {
        let session = Arc::clone(&self.session);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = session.login(&username, &password).await;
            let _ = tx.send(FetchResult::LoggedIn(result)).await;
        });
    }

    pub fn register(&self, form: RegisterStudent) {
        self.spawn_action(
            move |client| async move { client.students().register(&form).await },
            FetchResult::Registered,
        );
    }

    /// Re-fetch the signed-in student; the wallet balance moves after
    /// purchases and cancellations.
    pub fn refresh_user(&self) {
        self.spawn_action(
            |client| async move { client.students().current().await },
            FetchResult::User,
        );
    }

    pub fn load_events(&self) {
        self.spawn_query(
            "events".to_string(),
            |client| async move { client.events().list().await },
            FetchResult::Events,
        );
    }

    pub fn load_upcoming(&self) {
        self.spawn_query(
            "events/upcoming".to_string(),
            |client| async move { client.events().upcoming().await },
            FetchResult::Upcoming,
        );
    }

    pub fn load_event(&self, id: i64) {
        self.spawn_query(
            format!("event/{id}"),
            move |client| async move { client.events().get(id).await },
            move |result| FetchResult::EventDetail(id, result),
        );
    }

    pub fn load_event_reviews(&self, id: i64) {
        self.spawn_query(
            format!("event/{id}/reviews"),
            move |client| async move { client.events().reviews(id).await },
            move |result| FetchResult::EventReviews(id, result),
        );
    }

    pub fn load_clubs(&self) {
        self.spawn_query(
            "clubs".to_string(),
            |client| async move { client.clubs().list().await },
            FetchResult::Clubs,
        );
    }

    pub fn load_club(&self, id: i64) {
        self.spawn_query(
            format!("club/{id}"),
            move |client| async move { client.clubs().get(id).await },
            move |result| FetchResult::ClubDetail(id, result),
        );
    }

    pub fn load_club_events(&self, id: i64) {
        self.spawn_query(
            format!("club/{id}/events"),
            move |client| async move { client.clubs().events(id).await },
            move |result| FetchResult::ClubEvents(id, result),
        );
    }

    pub fn load_club_members(&self, id: i64) {
        self.spawn_query(
            format!("club/{id}/members"),
            move |client| async move { client.clubs().members(id).await },
            move |result| FetchResult::ClubMembers(id, result),
        );
    }

    pub fn load_tickets(&self) {
        self.spawn_query(
            "tickets".to_string(),
            |client| async move { client.tickets().list().await },
            FetchResult::Tickets,
        );
    }

    pub fn load_memberships(&self, student: i64) {
        self.spawn_query(
            "profile/memberships".to_string(),
            move |client| async move { client.students().clubs(student).await },
            FetchResult::Memberships,
        );
    }

    pub fn load_subscriptions(&self, student: i64) {
        self.spawn_query(
            "profile/subscriptions".to_string(),
            move |client| async move { client.students().subscriptions(student).await },
            FetchResult::Subscriptions,
        );
    }

    pub fn join_club(&self, id: i64) {
        self.spawn_action(
            move |client| async move { client.clubs().join(id).await },
            move |result| FetchResult::Joined(id, result),
        );
    }

    pub fn subscribe_club(&self, id: i64) {
        self.spawn_action(
            move |client| async move { client.clubs().subscribe(id).await },
            move |result| FetchResult::Subscribed(id, result),
        );
    }

    pub fn purchase(&self, event: i64, student: i64) {
        self.spawn_action(
            move |client| async move { client.tickets().purchase(event, student).await },
            FetchResult::Purchased,
        );
    }

    pub fn cancel_ticket(&self, id: i64) {
        self.spawn_action(
            move |client| async move { client.tickets().cancel(id).await },
            move |result| FetchResult::Cancelled(id, result),
        );
    }

    pub fn post_review(&self, event: i64, rating: u8, comment: String) {
        self.spawn_action(
            move |client| async move { client.events().create_review(event, rating, &comment).await },
            move |result| FetchResult::ReviewPosted(event, result),
        );
    }

    /// Spawn a cached dataset fetch. Skipped when a fetch for `key` is
    /// already in flight; successful results land in the cache before the
    /// channel send.
    fn spawn_query<T, Fut, Build, Wrap>(&self, key: String, build: Build, wrap: Wrap)
    where
        T: Serialize + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        Build: FnOnce(Arc<ApiClient>) -> Fut,
        Wrap: FnOnce(Result<T, ApiError>) -> FetchResult + Send + 'static,
    {
        if !self.cache.begin(&key) {
            tracing::debug!(%key, "fetch already in flight");
            return;
        }
        let cache = Arc::clone(&self.cache);
        let tx = self.tx.clone();
        let fut = build(Arc::clone(&self.client));
        tokio::spawn(async move {
            let result = fut.await;
            cache.finish(&key);
            if let Ok(data) = &result {
                cache.put(&key, data);
            }
            let _ = tx.send(wrap(result)).await;
        });
    }

    /// Spawn a mutation. Never deduplicated; pending-state guards live in
    /// the shell.
    fn spawn_action<T, Fut, Build, Wrap>(&self, build: Build, wrap: Wrap)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        Build: FnOnce(Arc<ApiClient>) -> Fut,
        Wrap: FnOnce(Result<T, ApiError>) -> FetchResult + Send + 'static,
    {
        let tx = self.tx.clone();
        let fut = build(Arc::clone(&self.client));
        tokio::spawn(async move {
            let _ = tx.send(wrap(fut.await)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_state_accessors() {
        let idle: QueryState<Vec<i64>> = QueryState::default();
        assert!(idle.data().is_none());
        assert!(!idle.is_loading());

        let ready = QueryState::Ready(vec![1, 2]);
        assert_eq!(ready.data(), Some(&vec![1, 2]));

        let failed: QueryState<Vec<i64>> = QueryState::Failed("boom".to_string());
        assert_eq!(failed.error(), Some("boom"));
        assert!(failed.data().is_none());
    }
}
