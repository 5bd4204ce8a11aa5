//! Client library for the CampusClubHub REST API.
//!
//! This crate hosts everything below the presentation layer: the session
//! lifecycle (token persistence, login/logout, startup rehydration), the
//! request client that normalizes error bodies and handles session expiry,
//! typed services for each resource family, client-side form validation,
//! and the per-key fetch cache used by the frontends.
//!
//! All business logic lives on the server; this crate only issues CRUD
//! requests and mirrors the response shapes.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod session;
pub mod store;
pub mod validate;

pub use cache::QueryCache;
pub use config::Config;
pub use error::ApiError;
pub use http::ApiClient;
pub use models::{
    AuthTokens, Club, ClubMember, Event, EventReview, RegisterStudent, Student, Subscription,
    Ticket, TicketType,
};
pub use session::SessionManager;
pub use store::SessionStore;
pub use validate::ValidationErrors;
