//! The remote operations the reconciliation engine consumes.
//!
//! [RemoteApi] is the seam between the engine and the orchestration API. The production
//! implementation is [AwxClient]; tests substitute a recording fake.

use crate::identity::RemoteId;
use crate::schema::Instance;
use async_trait::async_trait;
use thiserror::Error;

pub mod awx;

#[doc(inline)]
pub use awx::AwxClient;

/// A failed call to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API has no object at the requested location.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API answered with a non-success status other than 404.
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered successfully, but not with what was expected.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Remote CRUD operations, addressed by collection endpoint (e.g. `job_templates`).
///
/// Implementations must be safe to share across concurrent reconciliations: every method takes
/// `&self`, and the engine never mutates the client after construction.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Lists every instance in a collection, optionally filtered by query parameters.
    async fn list(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Instance>, ApiError>;

    /// Fetches one instance.
    async fn get(&self, endpoint: &str, id: RemoteId) -> Result<Instance, ApiError>;

    /// Creates an instance and returns the API's representation of it, including its `id`.
    async fn create(&self, endpoint: &str, fields: &Instance) -> Result<Instance, ApiError>;

    /// Replaces an instance's fields.
    async fn update(
        &self,
        endpoint: &str,
        id: RemoteId,
        fields: &Instance,
    ) -> Result<Instance, ApiError>;

    async fn delete(&self, endpoint: &str, id: RemoteId) -> Result<(), ApiError>;

    /// Attaches `member` to the owner's related list named `relation`.
    async fn associate(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        member: RemoteId,
    ) -> Result<(), ApiError>;

    /// Detaches `member` from the owner's related list named `relation`.
    async fn disassociate(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        member: RemoteId,
    ) -> Result<(), ApiError>;

    /// Lists the members currently in the owner's related list named `relation`.
    async fn list_associated(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
    ) -> Result<Vec<Instance>, ApiError>;
}

/// Reads the `id` field of a remote instance.
pub fn instance_id(instance: &Instance) -> Option<RemoteId> {
    instance.get("id").and_then(serde_json::Value::as_u64)
}

#[cfg(test)]
pub mod fixtures;
