//! Typed operations for each resource family, one method per endpoint.
//!
//! Services are thin accessors borrowed from an [`ApiClient`](crate::http::ApiClient)
//! (`client.clubs()`, `client.events()`, ...). They hold no state and no
//! branching logic; every method is a path template plus a response type.

mod clubs;
mod events;
mod students;
mod tickets;

pub use clubs::ClubService;
pub use events::EventService;
pub use students::StudentService;
pub use tickets::TicketService;
