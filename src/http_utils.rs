use std::error::Error;
use std::fmt;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cli_utils;

/// A failed request, with the status and message the server reported.
#[derive(Debug)]
pub struct HttpError {
    status: u16,
    message: String,
}

impl HttpError {
    pub fn status(&self) -> u16 {
        self.status
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl Error for HttpError {}

/// Client for the `/resource` routes of a trellis server.
pub struct TrellisClient {
    client: Client,
    base_url: String,
    roles: Vec<String>,
}

impl TrellisClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            roles: Vec::new(),
        }
    }

    /// Sends `roleIds` with every request.
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// URL of the resource `id[concept]`, extended by an interface path when not empty.
    pub fn resource_url(&self, concept: &str, id: &str, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/resource/{}/{}", self.base_url, concept, id)
        } else {
            format!("{}/resource/{}/{}/{}", self.base_url, concept, id, path)
        }
    }

    fn with_query(&self, builder: RequestBuilder, query: &[(&str, &str)]) -> RequestBuilder {
        let builder = builder.query(query);
        if self.roles.is_empty() {
            builder
        } else {
            builder.query(&[("roleIds", self.roles.join(","))])
        }
    }

    /// GETs the resource or list at `path`.
    pub async fn get(
        &self,
        concept: &str,
        id: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, Box<dyn Error>> {
        let url = self.resource_url(concept, id, path);
        let response = self
            .with_query(self.client.get(&url), query)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// PUTs `body` to `path`.
    pub async fn put<T>(
        &self,
        concept: &str,
        id: &str,
        path: &str,
        body: &Value,
        query: &[(&str, &str)],
    ) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(concept, id, path);
        let response = self
            .with_query(self.client.put(&url), query)
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// PATCHes `path` with a patch document.
    pub async fn patch<T>(
        &self,
        concept: &str,
        id: &str,
        path: &str,
        patches: &Value,
        query: &[(&str, &str)],
    ) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(concept, id, path);
        let response = self
            .with_query(self.client.patch(&url), query)
            .json(patches)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// POSTs a new-resource document to the list at `path`.
    pub async fn post<T>(
        &self,
        concept: &str,
        id: &str,
        path: &str,
        body: &Value,
        query: &[(&str, &str)],
    ) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(concept, id, path);
        let response = self
            .with_query(self.client.post(&url), query)
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// DELETEs the resource at `path`.
    pub async fn delete<T>(
        &self,
        concept: &str,
        id: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(concept, id, path);
        let response = self
            .with_query(self.client.delete(&url), query)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Deserializes a success; turns an error body `{"error", "msg"}` into an [`HttpError`].
    async fn handle_response<T>(&self, response: Response) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<Value>(&text) {
            Ok(body) => body
                .get("msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text),
            Err(_) if text.is_empty() => "No error details".to_string(),
            Err(_) => text,
        };
        Err(Box::new(HttpError {
            status: status.as_u16(),
            message,
        }))
    }
}

/// Execute an HTTP operation and exit on error with formatted message
pub async fn execute_or_exit<T, F, Fut>(operation: F, context: &str) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, Box<dyn Error>>>,
{
    match operation().await {
        Ok(result) => result,
        Err(e) => cli_utils::exit_with_error(&format!("{}: {}", context, e)),
    }
}
