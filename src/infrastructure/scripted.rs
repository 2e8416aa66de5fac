use crate::domain::ports::{InstanceIdProvider, SessionExecutor};
use crate::domain::request::ApiRequest;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<Value>>,
    calls: Vec<ApiRequest>,
    instance_id_requests: Vec<String>,
}

/// A session executor that replays canned responses in order.
///
/// Every executed request is recorded, so callers can assert on exactly what
/// went over the wire. `Clone` shares the script, which lets a test keep a
/// handle while the engines own another. Also serves instance ids.
#[derive(Clone)]
pub struct ScriptedExecutor {
    script: Arc<Mutex<Script>>,
    authorized: bool,
    instance_id: String,
}

impl ScriptedExecutor {
    /// An executor whose session holds a valid access token.
    pub fn authorized() -> Self {
        Self::with_authorization(true)
    }

    /// An executor without an access token; wallet calls fail with `InvalidToken`.
    pub fn anonymous() -> Self {
        Self::with_authorization(false)
    }

    fn with_authorization(authorized: bool) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            authorized,
            instance_id: "instance-1".to_string(),
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Queues a response body for the next call.
    pub fn respond(&self, body: Value) -> &Self {
        self.lock().responses.push_back(Ok(body));
        self
    }

    /// Queues a failure for the next call.
    pub fn fail(&self, error: PaymentError) -> &Self {
        self.lock().responses.push_back(Err(error));
        self
    }

    /// All requests executed so far, oldest first.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Client ids instance ids were requested for, oldest first.
    pub fn instance_id_requests(&self) -> Vec<String> {
        self.lock().instance_id_requests.clone()
    }

    pub fn pending_responses(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionExecutor for ScriptedExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let unauthorized = request.endpoint.requires_authorization() && !self.authorized;
        let mut script = self.lock();
        script.calls.push(request);
        if unauthorized {
            return Err(PaymentError::InvalidToken);
        }
        script.responses.pop_front().unwrap_or_else(|| {
            Err(PaymentError::Transport(
                "no scripted response left".to_string(),
            ))
        })
    }

    fn is_authorized(&self) -> bool {
        self.authorized
    }
}

#[async_trait]
impl InstanceIdProvider for ScriptedExecutor {
    async fn instance_id(&self, client_id: &str) -> Result<String> {
        self.lock().instance_id_requests.push(client_id.to_string());
        Ok(self.instance_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::Endpoint;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_responses_in_order() {
        let executor = ScriptedExecutor::authorized();
        executor
            .respond(json!({ "n": 1 }))
            .fail(PaymentError::Transport("reset".into()));

        let first = executor
            .execute(ApiRequest::new(Endpoint::RequestPayment))
            .await
            .unwrap();
        assert_eq!(first["n"], 1);

        let second = executor
            .execute(ApiRequest::new(Endpoint::ProcessPayment))
            .await;
        assert!(matches!(second, Err(PaymentError::Transport(_))));

        let exhausted = executor
            .execute(ApiRequest::new(Endpoint::ProcessPayment))
            .await;
        assert!(exhausted.unwrap_err().is_recoverable());
        assert_eq!(executor.call_count(), 3);
    }

    #[tokio::test]
    async fn test_anonymous_session_rejects_wallet_calls() {
        let executor = ScriptedExecutor::anonymous();
        executor.respond(json!({}));

        let result = executor
            .execute(ApiRequest::new(Endpoint::RequestPayment))
            .await;
        assert!(matches!(result, Err(PaymentError::InvalidToken)));
        assert_eq!(executor.pending_responses(), 1);

        let external = executor
            .execute(ApiRequest::new(Endpoint::RequestExternalPayment))
            .await;
        assert!(external.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_the_script() {
        let executor = ScriptedExecutor::anonymous().with_instance_id("abc");
        let shared: Arc<dyn InstanceIdProvider> = Arc::new(executor.clone());

        assert_eq!(shared.instance_id("client").await.unwrap(), "abc");
        assert_eq!(executor.instance_id_requests(), vec!["client".to_string()]);
    }
}
