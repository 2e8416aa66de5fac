use crate::error::{PaymentError, Result};
use serde::Deserialize;
use url::Url;

/// Settings an application registers with the payment server.
///
/// The external (anonymous card) flow needs all of them; the wallet flow
/// only uses the client id indirectly through the host's session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentConfig {
    /// Application id issued at registration, used to obtain instance ids.
    pub client_id: String,
    /// Where the bank sends the user after a successful ACS authorization.
    pub ext_auth_success_uri: Url,
    /// Where the bank sends the user after a failed ACS authorization.
    pub ext_auth_fail_uri: Url,
}

impl PaymentConfig {
    pub fn new(
        client_id: impl Into<String>,
        ext_auth_success_uri: Url,
        ext_auth_fail_uri: Url,
    ) -> Result<Self> {
        let config = Self {
            client_id: client_id.into(),
            ext_auth_success_uri,
            ext_auth_fail_uri,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "client_id must not be empty".to_string(),
            ));
        }
        for (name, uri) in [
            ("ext_auth_success_uri", &self.ext_auth_success_uri),
            ("ext_auth_fail_uri", &self.ext_auth_fail_uri),
        ] {
            if !matches!(uri.scheme(), "http" | "https") {
                return Err(PaymentError::Validation(format!(
                    "{name} must be an http(s) URI, got {uri}"
                )));
            }
        }
        if self.ext_auth_success_uri == self.ext_auth_fail_uri {
            return Err(PaymentError::Validation(
                "ext_auth_success_uri and ext_auth_fail_uri must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config = PaymentConfig::from_json_str(
            r#"{
                "client_id": "1B7B8C4D",
                "ext_auth_success_uri": "https://shop.example/success",
                "ext_auth_fail_uri": "https://shop.example/fail"
            }"#,
        )
        .unwrap();
        assert_eq!(config.client_id, "1B7B8C4D");
        assert_eq!(config.ext_auth_fail_uri.path(), "/fail");
    }

    #[test]
    fn test_config_rejects_empty_client_id() {
        let result = PaymentConfig::new(
            " ",
            Url::parse("https://shop.example/success").unwrap(),
            Url::parse("https://shop.example/fail").unwrap(),
        );
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_config_rejects_non_http_uri() {
        let result = PaymentConfig::new(
            "client",
            Url::parse("myapp://success").unwrap(),
            Url::parse("https://shop.example/fail").unwrap(),
        );
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_config_rejects_identical_uris() {
        let uri = Url::parse("https://shop.example/back").unwrap();
        let result = PaymentConfig::new("client", uri.clone(), uri);
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }
}
