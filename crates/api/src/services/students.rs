use serde_json::Value;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{ClubMember, RegisterStudent, Student, Subscription, Ticket};

/// Operations on `/students/` plus account endpoints.
pub struct StudentService<'a> {
    client: &'a ApiClient,
}

impl<'a> StudentService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// GET /students/current/, the authenticated user.
    pub async fn current(&self) -> Result<Student, ApiError> {
        self.client.get("/students/current/").await
    }

    /// POST /students/ creates an account. Reachable pre-login.
    pub async fn register(&self, form: &RegisterStudent) -> Result<Student, ApiError> {
        self.client.post_public("/students/", form).await
    }

    /// GET /students/{id}/
    pub async fn get(&self, id: i64) -> Result<Student, ApiError> {
        self.client.get(&format!("/students/{id}/")).await
    }

    /// GET /students/{id}/tickets/
    pub async fn tickets(&self, id: i64) -> Result<Vec<Ticket>, ApiError> {
        self.client.get(&format!("/students/{id}/tickets/")).await
    }

    /// GET /students/{id}/clubs/, the student's club memberships.
    pub async fn clubs(&self, id: i64) -> Result<Vec<ClubMember>, ApiError> {
        self.client.get(&format!("/students/{id}/clubs/")).await
    }

    /// GET /students/{id}/subscriptions/
    pub async fn subscriptions(&self, id: i64) -> Result<Vec<Subscription>, ApiError> {
        self.client
            .get(&format!("/students/{id}/subscriptions/"))
            .await
    }

    /// GET /verify-email/{username}/{token}/ confirms an email address
    /// from the link sent at registration. Reachable pre-login; the
    /// response body is informational only.
    pub async fn verify_email(&self, username: &str, token: &str) -> Result<(), ApiError> {
        let _: Value = self
            .client
            .get_public(&format!("/verify-email/{username}/{token}/"))
            .await?;
        Ok(())
    }
}
