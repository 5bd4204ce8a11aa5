use serde::Serialize;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Club, ClubMember, Event, Subscription};

#[derive(Debug, Serialize)]
struct JoinClubRequest<'a> {
    role: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscribeRequest {}

/// Operations on `/clubs/`.
pub struct ClubService<'a> {
    client: &'a ApiClient,
}

impl<'a> ClubService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// GET /clubs/
    pub async fn list(&self) -> Result<Vec<Club>, ApiError> {
        self.client.get("/clubs/").await
    }

    /// GET /clubs/{id}/
    pub async fn get(&self, id: i64) -> Result<Club, ApiError> {
        self.client.get(&format!("/clubs/{id}/")).await
    }

    /// GET /clubs/{id}/events/
    pub async fn events(&self, id: i64) -> Result<Vec<Event>, ApiError> {
        self.client.get(&format!("/clubs/{id}/events/")).await
    }

    /// GET /clubs/{id}/members/
    pub async fn members(&self, id: i64) -> Result<Vec<ClubMember>, ApiError> {
        self.client.get(&format!("/clubs/{id}/members/")).await
    }

    /// POST /clubs/{id}/members/ joins as a regular member.
    pub async fn join(&self, id: i64) -> Result<ClubMember, ApiError> {
        self.client
            .post(
                &format!("/clubs/{id}/members/"),
                &JoinClubRequest { role: "member" },
            )
            .await
    }

    /// POST /clubs/{id}/subscriptions/
    pub async fn subscribe(&self, id: i64) -> Result<Subscription, ApiError> {
        self.client
            .post(&format!("/clubs/{id}/subscriptions/"), &SubscribeRequest {})
            .await
    }
}
