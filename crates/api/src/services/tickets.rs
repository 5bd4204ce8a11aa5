use serde::Serialize;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::Ticket;

#[derive(Debug, Serialize)]
struct PurchaseTicketRequest {
    event: i64,
    student: i64,
}

/// Operations on `/tickets/`.
pub struct TicketService<'a> {
    client: &'a ApiClient,
}

impl<'a> TicketService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// GET /tickets/
    pub async fn list(&self) -> Result<Vec<Ticket>, ApiError> {
        self.client.get("/tickets/").await
    }

    /// GET /tickets/{id}/
    pub async fn get(&self, id: i64) -> Result<Ticket, ApiError> {
        self.client.get(&format!("/tickets/{id}/")).await
    }

    /// POST /tickets/ purchases a ticket for `event` on behalf of
    /// `student`. Inventory and wallet checks happen server-side.
    pub async fn purchase(&self, event: i64, student: i64) -> Result<Ticket, ApiError> {
        self.client
            .post("/tickets/", &PurchaseTicketRequest { event, student })
            .await
    }

    /// DELETE /tickets/{id}/ cancels a purchased ticket. Answers 204.
    pub async fn cancel(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/tickets/{id}/")).await
    }
}
