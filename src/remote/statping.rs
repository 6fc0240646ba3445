use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use super::{RemoteStore, StoreError};
use crate::models::{CheckSpec, RemoteCheck, RemoteGroup};

/// A [`RemoteStore`] backed by the Statping HTTP API.
pub struct StatpingClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewGroup<'a> {
    name: &'a str,
    public: bool,
}

#[derive(Deserialize)]
struct CreatedResponse {
    #[serde(default)]
    id: Option<i64>,
}

#[derive(Deserialize)]
struct UpdatedResponse {
    #[serde(default)]
    output: Option<RemoteCheck>,
}

impl StatpingClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| StoreError::InvalidConfiguration(format!("Invalid API token: {e}")))?;
        auth_value.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Only a plain 200 counts as success for this API.
    async fn ensure_ok(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        Err(StoreError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteStore for StatpingClient {
    async fn list_groups(&self) -> Result<Vec<RemoteGroup>, StoreError> {
        let response = self.client.get(self.url("groups")).send().await?;
        let response = Self::ensure_ok(response).await?;
        let records: Option<Vec<_>> = Self::read_json(response).await?;
        Ok(records.unwrap_or_default())
    }

    async fn create_group(&self, name: &str, public: bool) -> Result<RemoteGroup, StoreError> {
        let response = self
            .client
            .post(self.url("groups"))
            .json(&NewGroup { name, public })
            .send()
            .await?;
        let response = Self::ensure_ok(response).await?;
        let created: CreatedResponse = Self::read_json(response).await?;
        debug!(group = %name, id = ?created.id, "Group create acknowledged.");

        Ok(RemoteGroup {
            id: created.id,
            name: name.to_string(),
            public: Some(public),
        })
    }

    async fn list_checks(&self) -> Result<Vec<RemoteCheck>, StoreError> {
        let response = self.client.get(self.url("services")).send().await?;
        let response = Self::ensure_ok(response).await?;
        let records: Option<Vec<_>> = Self::read_json(response).await?;
        Ok(records.unwrap_or_default())
    }

    async fn create_check(&self, spec: &CheckSpec) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url("services"))
            .json(spec)
            .send()
            .await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }

    async fn update_check(
        &self,
        id: i64,
        body: &Map<String, Value>,
    ) -> Result<RemoteCheck, StoreError> {
        if id <= 0 || body.is_empty() {
            return Err(StoreError::MissingIdentity);
        }

        let response = self
            .client
            .post(self.url(&format!("services/{id}")))
            .json(body)
            .send()
            .await?;
        let response = Self::ensure_ok(response).await?;

        // Without an `output` record, report the check as sent.
        let updated: Option<RemoteCheck> = Self::read_json::<UpdatedResponse>(response)
            .await
            .ok()
            .and_then(|r| r.output);
        Ok(updated.unwrap_or_else(|| RemoteCheck {
            id,
            name: body
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            group_id: body.get("group_id").and_then(Value::as_i64),
        }))
    }
}
