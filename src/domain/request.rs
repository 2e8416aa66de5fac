use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Name/value pairs sent with a call. Ordered so requests compare and log stably.
pub type ParameterMap = BTreeMap<String, String>;

/// The remote operation a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Endpoint {
    RequestPayment,
    ProcessPayment,
    RequestExternalPayment,
    ProcessExternalPayment,
    Showcase(Url),
}

impl Endpoint {
    /// Path segment used by the wallet API, or the absolute url for showcase steps.
    pub fn path(&self) -> &str {
        match self {
            Endpoint::RequestPayment => "request-payment",
            Endpoint::ProcessPayment => "process-payment",
            Endpoint::RequestExternalPayment => "request-external-payment",
            Endpoint::ProcessExternalPayment => "process-external-payment",
            Endpoint::Showcase(url) => url.as_str(),
        }
    }

    /// Whether the executor must attach the session's access token.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Endpoint::RequestPayment | Endpoint::ProcessPayment)
    }
}

/// A transport-agnostic description of one call, handed to the session executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub params: ParameterMap,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: ParameterMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn param_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn params(mut self, params: ParameterMap) -> Self {
        self.params.extend(params);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_collects_params() {
        let request = ApiRequest::new(Endpoint::ProcessPayment)
            .param("request_id", "r1")
            .param_opt("csc", None::<String>)
            .param_opt("money_source", Some("wallet"));

        assert_eq!(request.params.len(), 2);
        assert_eq!(request.params["request_id"], "r1");
        assert_eq!(request.params["money_source"], "wallet");
    }

    #[test]
    fn test_endpoint_authorization() {
        assert!(Endpoint::RequestPayment.requires_authorization());
        assert!(!Endpoint::RequestExternalPayment.requires_authorization());
        let url = Url::parse("https://example.com/showcase/1").unwrap();
        assert_eq!(Endpoint::Showcase(url).path(), "https://example.com/showcase/1");
    }
}
