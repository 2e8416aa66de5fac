use super::request::ParameterMap;
use super::results::{PaymentProcessResult, PaymentRequestResult};
use serde::{Deserialize, Serialize};

/// Progress of one payment attempt.
///
/// A refusal is a completed outcome, so there is no separate failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    #[default]
    Created,
    Started,
    Completed,
}

/// Which authentication mode drives the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentContext {
    Wallet,
    External,
}

impl PaymentContext {
    pub fn ordinal(self) -> u32 {
        match self {
            PaymentContext::Wallet => 0,
            PaymentContext::External => 1,
        }
    }

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(PaymentContext::Wallet),
            1 => Some(PaymentContext::External),
            _ => None,
        }
    }
}

/// The funding instrument chosen by the payer for the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoneySource {
    #[default]
    Wallet,
    ExternalCard { token: String },
}

impl MoneySource {
    pub fn external_card(token: impl Into<String>) -> Self {
        MoneySource::ExternalCard {
            token: token.into(),
        }
    }

    /// The context able to charge this money source.
    pub fn context(&self) -> PaymentContext {
        match self {
            MoneySource::Wallet => PaymentContext::Wallet,
            MoneySource::ExternalCard { .. } => PaymentContext::External,
        }
    }
}

/// Supplies the caller's payment inputs to the orchestrators on every call.
pub trait ParameterProvider: Send + Sync {
    fn pattern_id(&self) -> &str;
    fn payment_parameters(&self) -> ParameterMap;
    fn money_source(&self) -> MoneySource;

    /// Card security code, when the money source needs one.
    fn csc(&self) -> Option<&str> {
        None
    }
}

/// Plain-data [`ParameterProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentParameters {
    pub pattern_id: String,
    pub params: ParameterMap,
    #[serde(default)]
    pub money_source: MoneySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csc: Option<String>,
}

impl PaymentParameters {
    pub fn new(pattern_id: impl Into<String>, params: ParameterMap) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            params,
            money_source: MoneySource::Wallet,
            csc: None,
        }
    }

    pub fn with_money_source(mut self, money_source: MoneySource) -> Self {
        self.money_source = money_source;
        self
    }

    pub fn with_csc(mut self, csc: impl Into<String>) -> Self {
        self.csc = Some(csc.into());
        self
    }
}

impl ParameterProvider for PaymentParameters {
    fn pattern_id(&self) -> &str {
        &self.pattern_id
    }

    fn payment_parameters(&self) -> ParameterMap {
        self.params.clone()
    }

    fn money_source(&self) -> MoneySource {
        self.money_source.clone()
    }

    fn csc(&self) -> Option<&str> {
        self.csc.as_deref()
    }
}

/// Saved progress of a single payment orchestrator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_result: Option<PaymentRequestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_result: Option<PaymentProcessResult>,
    #[serde(default)]
    pub process_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ordinals() {
        for context in [PaymentContext::Wallet, PaymentContext::External] {
            assert_eq!(PaymentContext::from_ordinal(context.ordinal()), Some(context));
        }
        assert_eq!(PaymentContext::from_ordinal(2), None);
    }

    #[test]
    fn test_money_source_context() {
        assert_eq!(MoneySource::Wallet.context(), PaymentContext::Wallet);
        assert_eq!(
            MoneySource::external_card("tok-1").context(),
            PaymentContext::External
        );
    }

    #[test]
    fn test_payment_parameters_provider() {
        let mut params = ParameterMap::new();
        params.insert("to".into(), "410011161616877".into());
        params.insert("amount_due".into(), "10.00".into());

        let provider = PaymentParameters::new("p2p", params)
            .with_money_source(MoneySource::external_card("tok-1"))
            .with_csc("123");

        assert_eq!(provider.pattern_id(), "p2p");
        assert_eq!(provider.payment_parameters()["to"], "410011161616877");
        assert_eq!(provider.csc(), Some("123"));
        assert_eq!(provider.money_source(), MoneySource::external_card("tok-1"));
    }
}
