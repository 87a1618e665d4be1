use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

use super::{ClientError, ClientResult};
use crate::auth::dto::{
    AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UpdateProfileRequest,
};
use crate::auth::repo_types::Profile;
use crate::tasks::dto::{
    CreateTaskRequest, MessageResponse, StatsResponse, TaskListResponse, TaskQuery,
    TaskResponse, TaskStats, TaskView, UpdateTaskRequest,
};

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Stateless wrapper over the JSON endpoints. Token handling lives in
/// [`super::Session`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}/api{}", self.base_url, path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<AuthResponse> {
        Self::send(self.request(Method::POST, "/auth/register", None).json(req)).await
    }

    pub async fn login(&self, req: &LoginRequest) -> ClientResult<AuthResponse> {
        Self::send(self.request(Method::POST, "/auth/login", None).json(req)).await
    }

    pub async fn profile(&self, token: &str) -> ClientResult<Profile> {
        let resp: ProfileResponse =
            Self::send(self.request(Method::GET, "/auth/profile", Some(token))).await?;
        Ok(resp.user)
    }

    pub async fn update_profile(
        &self,
        token: &str,
        req: &UpdateProfileRequest,
    ) -> ClientResult<AuthResponse> {
        Self::send(self.request(Method::PUT, "/auth/profile", Some(token)).json(req)).await
    }

    pub async fn list_tasks(&self, token: &str, query: &TaskQuery) -> ClientResult<Vec<TaskView>> {
        let resp: TaskListResponse =
            Self::send(self.request(Method::GET, "/tasks", Some(token)).query(query)).await?;
        Ok(resp.tasks)
    }

    pub async fn get_task(&self, token: &str, id: Uuid) -> ClientResult<TaskView> {
        let resp: TaskResponse =
            Self::send(self.request(Method::GET, &format!("/tasks/{id}"), Some(token))).await?;
        Ok(resp.task)
    }

    pub async fn create_task(&self, token: &str, req: &CreateTaskRequest) -> ClientResult<TaskView> {
        let resp: TaskResponse =
            Self::send(self.request(Method::POST, "/tasks", Some(token)).json(req)).await?;
        Ok(resp.task)
    }

    pub async fn update_task(
        &self,
        token: &str,
        id: Uuid,
        req: &UpdateTaskRequest,
    ) -> ClientResult<TaskView> {
        let builder = self
            .request(Method::PUT, &format!("/tasks/{id}"), Some(token))
            .json(req);
        let resp: TaskResponse = Self::send(builder).await?;
        Ok(resp.task)
    }

    pub async fn delete_task(&self, token: &str, id: Uuid) -> ClientResult<String> {
        let resp: MessageResponse =
            Self::send(self.request(Method::DELETE, &format!("/tasks/{id}"), Some(token))).await?;
        Ok(resp.message)
    }

    pub async fn stats(&self, token: &str) -> ClientResult<TaskStats> {
        let resp: StatsResponse =
            Self::send(self.request(Method::GET, "/tasks/stats", Some(token))).await?;
        Ok(resp.stats)
    }
}
