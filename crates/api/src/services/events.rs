use serde::Serialize;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Event, EventReview};

#[derive(Debug, Serialize)]
struct CreateReviewRequest<'a> {
    rating: u8,
    comment: &'a str,
}

/// Operations on `/events/`.
pub struct EventService<'a> {
    client: &'a ApiClient,
}

impl<'a> EventService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// GET /events/
    pub async fn list(&self) -> Result<Vec<Event>, ApiError> {
        self.client.get("/events/").await
    }

    /// GET /events/?upcoming=true
    pub async fn upcoming(&self) -> Result<Vec<Event>, ApiError> {
        self.client.get("/events/?upcoming=true").await
    }

    /// GET /events/{id}/
    pub async fn get(&self, id: i64) -> Result<Event, ApiError> {
        self.client.get(&format!("/events/{id}/")).await
    }

    /// GET /events/{id}/reviews/
    pub async fn reviews(&self, id: i64) -> Result<Vec<EventReview>, ApiError> {
        self.client.get(&format!("/events/{id}/reviews/")).await
    }

    /// POST /events/{id}/reviews/
    pub async fn create_review(
        &self,
        id: i64,
        rating: u8,
        comment: &str,
    ) -> Result<EventReview, ApiError> {
        self.client
            .post(
                &format!("/events/{id}/reviews/"),
                &CreateReviewRequest { rating, comment },
            )
            .await
    }
}
