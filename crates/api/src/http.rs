use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{extract_message, ApiError};
use crate::services::{ClubService, EventService, StudentService, TicketService};
use crate::store::SessionStore;

/// Whether a request must carry the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Required,
    Public,
}

/// HTTP client for the CampusClubHub API.
///
/// Owns the connection pool, the base URL, and a handle to the session
/// store. Every request runs through [`execute`](Self::execute), which
/// implements the shared contract: fail fast when an authenticated call has
/// no token, attach the bearer header, map 401 to a session purge, map 204
/// to an empty result, and extract a readable message from every other
/// error body.
///
/// The client never navigates or renders; on session expiry it returns
/// [`ApiError::SessionExpired`] and leaves routing to the shell.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<SessionStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run one request to completion: built, sent, then exactly one of
    /// success, http-error, network-error, or auth-missing. No retries, no
    /// timeouts beyond reqwest defaults, no cancellation.
    ///
    /// `Ok(None)` is an empty result (204 or empty body). The 401 purge only
    /// applies to authenticated calls; a public endpoint answering 401 (a
    /// failed token exchange) reports its extracted message like any other
    /// error so no stored state is touched.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        auth: Auth,
    ) -> Result<Option<Value>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);

        if auth == Auth::Required {
            match self.store.access_token() {
                Some(token) => request = request.bearer_auth(token),
                None => {
                    tracing::debug!(path, "authenticated call with no stored token");
                    return Err(ApiError::AuthRequired);
                }
            }
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && auth == Auth::Required {
            // The session is gone. Purge the stored pair here so the state
            // is consistent no matter which view triggered the request; the
            // shell observes the variant and routes back to login.
            self.store.clear();
            tracing::info!(path, "server returned 401, stored session cleared");
            return Err(ApiError::SessionExpired);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            let body: Value = response
                .json()
                .await
                .unwrap_or(Value::Null);
            let message = extract_message(&body);
            tracing::debug!(path, status = status.as_u16(), %message, "request failed");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&text)?;
        Ok(Some(value))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(self.execute(Method::GET, path, None, Auth::Required).await?)
    }

    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(self.execute(Method::GET, path, None, Auth::Public).await?)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        decode(
            self.execute(Method::POST, path, Some(body), Auth::Required)
                .await?,
        )
    }

    pub async fn post_public<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        decode(
            self.execute(Method::POST, path, Some(body), Auth::Public)
                .await?,
        )
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        decode(
            self.execute(Method::PUT, path, Some(body), Auth::Required)
                .await?,
        )
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        decode(
            self.execute(Method::PATCH, path, Some(body), Auth::Required)
                .await?,
        )
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(
            self.execute(Method::DELETE, path, None, Auth::Required)
                .await?,
        )
    }

    pub fn clubs(&self) -> ClubService<'_> {
        ClubService::new(self)
    }

    pub fn events(&self) -> EventService<'_> {
        EventService::new(self)
    }

    pub fn students(&self) -> StudentService<'_> {
        StudentService::new(self)
    }

    pub fn tickets(&self) -> TicketService<'_> {
        TicketService::new(self)
    }
}

/// Empty results decode through JSON `null`, so `()` and `Option<T>` work
/// naturally for 204 responses.
fn decode<T: DeserializeOwned>(value: Option<Value>) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
}
