use super::request::ApiRequest;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Executes calls against the payment server on behalf of a session.
///
/// Implementations own transport, authentication headers and HTTP status
/// mapping. A body is returned for both success and business refusals;
/// everything else surfaces as `InvalidToken`, `InsufficientScope`,
/// `InvalidRequest` or `Transport`.
#[async_trait]
pub trait SessionExecutor: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value>;

    /// Whether the session currently holds a usable access token.
    fn is_authorized(&self) -> bool;
}

/// Issues instance ids that bind an anonymous device to a payment attempt.
#[async_trait]
pub trait InstanceIdProvider: Send + Sync {
    async fn instance_id(&self, client_id: &str) -> Result<String>;
}

/// Key/value persistence for saved orchestrator and wizard state.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, key: &str, snapshot: Value) -> Result<()>;
    async fn load(&self, key: &str) -> Result<Option<Value>>;
    async fn remove(&self, key: &str) -> Result<()>;
}

pub type SharedExecutor = Arc<dyn SessionExecutor>;
pub type SharedInstanceIdProvider = Arc<dyn InstanceIdProvider>;
pub type SnapshotStoreBox = Box<dyn SnapshotStore>;
