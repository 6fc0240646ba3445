use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{CheckSpec, RemoteCheck, RemoteGroup};

pub mod statping;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Remote API returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Refusing to update a check without an identifier or body")]
    MissingIdentity,
    #[error("Invalid configuration for remote store: {0}")]
    InvalidConfiguration(String),
}

/// Authenticated access to the monitoring service's groups and checks.
///
/// Every call is a single round trip. Implementations neither cache nor retry;
/// deciding what a failure means is left to the caller.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches every group the service knows about.
    async fn list_groups(&self) -> Result<Vec<RemoteGroup>, StoreError>;

    /// Creates a group. The returned record has no identifier when the
    /// service accepted the request without assigning one.
    async fn create_group(&self, name: &str, public: bool) -> Result<RemoteGroup, StoreError>;

    /// Fetches every check (service) the monitoring service knows about.
    async fn list_checks(&self) -> Result<Vec<RemoteCheck>, StoreError>;

    async fn create_check(&self, spec: &CheckSpec) -> Result<(), StoreError>;

    /// Replaces the fields in `body` on the check `id`.
    ///
    /// Fails with [`StoreError::MissingIdentity`] without touching the network
    /// when `id` is not a positive identifier or `body` is empty.
    async fn update_check(
        &self,
        id: i64,
        body: &Map<String, Value>,
    ) -> Result<RemoteCheck, StoreError>;
}
