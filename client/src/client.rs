//! Thin JSON client over the `{ ok, ...payload }` envelope.

use std::time::Duration;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::models::{
    DashboardPayload, DashboardStats, Task, TaskFilter, TaskListPayload, TaskPatch, TaskPayload,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiClientBuilder {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl ApiClientBuilder {
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;
        Ok(ApiClient {
            http,
            base_url,
            token: self.token,
        })
    }
}

/// Client for the editor API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Absolute URL for `path` with `query` appended.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let url = self.url("/api/editor/tasks", &[("status", filter.as_str())])?;
        let payload: TaskListPayload = self.send(Method::GET, url, None::<&()>).await?;
        Ok(payload.tasks)
    }

    pub async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task> {
        let url = self.url(&format!("/api/editor/tasks/{}", id), &[])?;
        let payload: TaskPayload = self.send(Method::PATCH, url, Some(patch)).await?;
        Ok(payload.task)
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let url = self.url("/api/editor/dashboard", &[])?;
        let payload: DashboardPayload = self.send(Method::GET, url, None::<&()>).await?;
        Ok(payload.stats)
    }

    async fn send<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(%method, %url, "API request");
        let mut request = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode_envelope(status.as_u16(), &bytes)
    }
}

/// Unwrap a response envelope into its payload.
///
/// A non-2xx status or `ok: false` becomes `ClientError::Server` carrying the
/// envelope's `error` string.
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) if (200..300).contains(&status) => return Err(e.into()),
        Err(_) => {
            return Err(ClientError::Server {
                status,
                message: format!("Request failed with status {}", status),
            })
        }
    };

    let ok = value.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if !(200..300).contains(&status) || !ok {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        return Err(ClientError::Server { status, message });
    }

    Ok(serde_json::from_value(value)?)
}
