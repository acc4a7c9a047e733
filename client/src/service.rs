// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use common::{NewTaskPayload, SigninPayload, SignupPayload, Task, TaskId, UserData};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;

/// The remote to-do API. Transport and authentication are the implementor's concern.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Every task whose estimated date is on or before `max_date`.
    async fn list_tasks(&self, max_date: DateTime<Utc>) -> Result<Vec<Task>, ServiceError>;

    async fn create_task(
        &self,
        description: &str,
        estimated_at: DateTime<Utc>,
    ) -> Result<(), ServiceError>;

    async fn toggle_task(&self, id: TaskId) -> Result<(), ServiceError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), ServiceError>;

    async fn signup(&self, payload: &SignupPayload) -> Result<(), ServiceError>;

    async fn signin(&self, payload: &SigninPayload) -> Result<UserData, ServiceError>;
}

/// `TaskService` talking JSON over HTTP.
///
/// The bearer token is carried by the instance and attached to each request,
/// so two clients with different credentials can coexist in one process.
#[derive(Clone)]
pub struct HttpTaskService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTaskService {
    /// Creates an unauthenticated client for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Returns a copy of this client that authenticates with `token`.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("bearer {token}")),
            None => request,
        }
    }

    /// Sends the request and turns any non-2xx answer into `ServiceError::Rejected`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            error!("Request to {} failed: {:?}", self.base_url, e);
            ServiceError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The body is what the server wants the user to see.
        let message = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read error body (status {}): {:?}", status.as_u16(), e);
                String::new()
            }
        };
        error!(
            "Server responded with error: status_code={}, message={}",
            status.as_u16(),
            message
        );
        Err(ServiceError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TaskService for HttpTaskService {
    async fn list_tasks(&self, max_date: DateTime<Utc>) -> Result<Vec<Task>, ServiceError> {
        let date = max_date.to_rfc3339_opts(SecondsFormat::Secs, true);
        debug!("Listing tasks up to {}", date);

        let request = self.client.get(self.url("/tasks")).query(&[("date", date)]);
        let tasks: Vec<Task> = self.send(request).await?.json().await?;

        info!("Successfully retrieved {} tasks.", tasks.len());
        Ok(tasks)
    }

    async fn create_task(
        &self,
        description: &str,
        estimated_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let payload = NewTaskPayload {
            description: description.to_string(),
            estimated_at,
        };
        debug!("Creating task: {:?}", payload);

        let request = self.client.post(self.url("/tasks")).json(&payload);
        self.send(request).await?;
        Ok(())
    }

    async fn toggle_task(&self, id: TaskId) -> Result<(), ServiceError> {
        debug!("Toggling task with ID: {}", id);
        let request = self.client.put(self.url(&format!("/tasks/{id}/toggle")));
        self.send(request).await?;
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ServiceError> {
        debug!("Deleting task with ID: {}", id);
        let request = self.client.delete(self.url(&format!("/tasks/{id}")));
        self.send(request).await?;
        Ok(())
    }

    async fn signup(&self, payload: &SignupPayload) -> Result<(), ServiceError> {
        debug!("Creating account for {}", payload.email);
        let request = self.client.post(self.url("/signup")).json(payload);
        self.send(request).await?;
        info!("Account created for {}", payload.email);
        Ok(())
    }

    async fn signin(&self, payload: &SigninPayload) -> Result<UserData, ServiceError> {
        debug!("Signing in as {}", payload.email);
        let request = self.client.post(self.url("/signin")).json(payload);
        let user: UserData = self.send(request).await?.json().await?;
        info!("Signed in as {}", user.email);
        Ok(user)
    }
}
