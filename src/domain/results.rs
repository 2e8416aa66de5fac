//! Server outcomes of the two payment steps.
//!
//! Each step yields one struct tagged by a status, with the optional fields
//! that status requires. Wire bodies pass through a raw mirror struct and are
//! checked by `validate` before a result value exists.

use super::money::Amount;
use super::request::ParameterMap;
use crate::error::{PaymentError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Delay the server implies for an IN_PROGRESS payment when it names none.
pub const DEFAULT_NEXT_RETRY_MS: u64 = 5000;

/// Refusal reasons reported by the payment server.
///
/// Unknown codes are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    IllegalParams,
    IllegalParamLabel,
    IllegalParamTo,
    IllegalParamAmount,
    IllegalParamAmountDue,
    IllegalParamComment,
    IllegalParamMessage,
    IllegalParamExpirePeriod,
    IllegalParamCsc,
    IllegalParamInstanceId,
    IllegalParamRequestId,
    IllegalParamClientId,
    IllegalParamExtAuthSuccessUri,
    IllegalParamExtAuthFailUri,
    NotEnoughFunds,
    PaymentRefused,
    PayeeNotFound,
    AuthorizationReject,
    LimitExceeded,
    AccountBlocked,
    AccountClosed,
    ExtActionRequired,
    MoneySourceNotAvailable,
    ContractNotFound,
    TechnicalError,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::IllegalParams => "illegal_params",
            ErrorCode::IllegalParamLabel => "illegal_param_label",
            ErrorCode::IllegalParamTo => "illegal_param_to",
            ErrorCode::IllegalParamAmount => "illegal_param_amount",
            ErrorCode::IllegalParamAmountDue => "illegal_param_amount_due",
            ErrorCode::IllegalParamComment => "illegal_param_comment",
            ErrorCode::IllegalParamMessage => "illegal_param_message",
            ErrorCode::IllegalParamExpirePeriod => "illegal_param_expire_period",
            ErrorCode::IllegalParamCsc => "illegal_param_csc",
            ErrorCode::IllegalParamInstanceId => "illegal_param_instance_id",
            ErrorCode::IllegalParamRequestId => "illegal_param_request_id",
            ErrorCode::IllegalParamClientId => "illegal_param_client_id",
            ErrorCode::IllegalParamExtAuthSuccessUri => "illegal_param_ext_auth_success_uri",
            ErrorCode::IllegalParamExtAuthFailUri => "illegal_param_ext_auth_fail_uri",
            ErrorCode::NotEnoughFunds => "not_enough_funds",
            ErrorCode::PaymentRefused => "payment_refused",
            ErrorCode::PayeeNotFound => "payee_not_found",
            ErrorCode::AuthorizationReject => "authorization_reject",
            ErrorCode::LimitExceeded => "limit_exceeded",
            ErrorCode::AccountBlocked => "account_blocked",
            ErrorCode::AccountClosed => "account_closed",
            ErrorCode::ExtActionRequired => "ext_action_required",
            ErrorCode::MoneySourceNotAvailable => "money_source_not_available",
            ErrorCode::ContractNotFound => "contract_not_found",
            ErrorCode::TechnicalError => "technical_error",
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "illegal_params" => ErrorCode::IllegalParams,
            "illegal_param_label" => ErrorCode::IllegalParamLabel,
            "illegal_param_to" => ErrorCode::IllegalParamTo,
            "illegal_param_amount" => ErrorCode::IllegalParamAmount,
            "illegal_param_amount_due" => ErrorCode::IllegalParamAmountDue,
            "illegal_param_comment" => ErrorCode::IllegalParamComment,
            "illegal_param_message" => ErrorCode::IllegalParamMessage,
            "illegal_param_expire_period" => ErrorCode::IllegalParamExpirePeriod,
            "illegal_param_csc" => ErrorCode::IllegalParamCsc,
            "illegal_param_instance_id" => ErrorCode::IllegalParamInstanceId,
            "illegal_param_request_id" => ErrorCode::IllegalParamRequestId,
            "illegal_param_client_id" => ErrorCode::IllegalParamClientId,
            "illegal_param_ext_auth_success_uri" => ErrorCode::IllegalParamExtAuthSuccessUri,
            "illegal_param_ext_auth_fail_uri" => ErrorCode::IllegalParamExtAuthFailUri,
            "not_enough_funds" => ErrorCode::NotEnoughFunds,
            "payment_refused" => ErrorCode::PaymentRefused,
            "payee_not_found" => ErrorCode::PayeeNotFound,
            "authorization_reject" => ErrorCode::AuthorizationReject,
            "limit_exceeded" => ErrorCode::LimitExceeded,
            "account_blocked" => ErrorCode::AccountBlocked,
            "account_closed" => ErrorCode::AccountClosed,
            "ext_action_required" => ErrorCode::ExtActionRequired,
            "money_source_not_available" => ErrorCode::MoneySourceNotAvailable,
            "contract_not_found" => ErrorCode::ContractNotFound,
            "technical_error" => ErrorCode::TechnicalError,
            _ => ErrorCode::Other(code),
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Success,
    Refused,
    HoldForPickup,
}

/// Outcome of request-payment: a quote to pay against, or a refusal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPaymentRequest", into = "RawPaymentRequest")]
pub struct PaymentRequestResult {
    status: RequestStatus,
    request_id: Option<String>,
    contract_amount: Option<Amount>,
    balance: Option<Amount>,
    error: Option<ErrorCode>,
    error_description: Option<String>,
}

impl PaymentRequestResult {
    pub fn success(request_id: impl Into<String>, contract_amount: Amount) -> Self {
        Self::quoted(RequestStatus::Success, request_id.into(), contract_amount)
    }

    pub fn hold_for_pickup(request_id: impl Into<String>, contract_amount: Amount) -> Self {
        Self::quoted(RequestStatus::HoldForPickup, request_id.into(), contract_amount)
    }

    pub fn refused(error: ErrorCode, contract_amount: Option<Amount>) -> Result<Self> {
        Self {
            status: RequestStatus::Refused,
            request_id: None,
            contract_amount,
            balance: None,
            error: Some(error),
            error_description: None,
        }
        .validate()
    }

    fn quoted(status: RequestStatus, request_id: String, contract_amount: Amount) -> Self {
        Self {
            status,
            request_id: Some(request_id),
            contract_amount: Some(contract_amount),
            balance: None,
            error: None,
            error_description: None,
        }
    }

    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// Checks the fields mandatory for the reported status.
    pub fn validate(self) -> Result<Self> {
        const RESPONSE: &str = "request-payment";
        match self.status {
            RequestStatus::Success | RequestStatus::HoldForPickup => {
                if self.request_id.as_deref().is_none_or(str::is_empty) {
                    return Err(PaymentError::MissingField {
                        response: RESPONSE,
                        field: "request_id",
                    });
                }
                if self.contract_amount.is_none() {
                    return Err(PaymentError::MissingField {
                        response: RESPONSE,
                        field: "contract_amount",
                    });
                }
            }
            RequestStatus::Refused => match &self.error {
                None => {
                    return Err(PaymentError::MissingField {
                        response: RESPONSE,
                        field: "error",
                    });
                }
                Some(ErrorCode::NotEnoughFunds) if self.contract_amount.is_none() => {
                    return Err(PaymentError::MissingField {
                        response: RESPONSE,
                        field: "contract_amount",
                    });
                }
                Some(_) => {}
            },
        }
        Ok(self)
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Whether process-payment may follow this result.
    pub fn is_payable(&self) -> bool {
        self.status != RequestStatus::Refused
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn contract_amount(&self) -> Option<Amount> {
        self.contract_amount
    }

    pub fn balance(&self) -> Option<Amount> {
        self.balance
    }

    pub fn error(&self) -> Option<&ErrorCode> {
        self.error.as_ref()
    }

    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }
}

/// A step outcome decoded from a server body.
///
/// Bodies that do not match the wire shape are `InvalidResponse`; bodies
/// lacking a field their status requires are `MissingField`.
pub trait FromResponse: Sized {
    fn from_response(body: Value) -> Result<Self>;
}

fn decode<R, T>(response: &str, body: Value) -> Result<T>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = PaymentError>,
{
    let raw: R = serde_json::from_value(body)
        .map_err(|e| PaymentError::InvalidResponse(format!("{response}: {e}")))?;
    T::try_from(raw)
}

impl FromResponse for PaymentRequestResult {
    fn from_response(body: Value) -> Result<Self> {
        decode::<RawPaymentRequest, _>("request-payment", body)
    }
}

impl FromResponse for PaymentProcessResult {
    fn from_response(body: Value) -> Result<Self> {
        decode::<RawPaymentProcess, _>("process-payment", body)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPaymentRequest {
    status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contract_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    balance: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
}

impl TryFrom<RawPaymentRequest> for PaymentRequestResult {
    type Error = PaymentError;

    fn try_from(raw: RawPaymentRequest) -> Result<Self> {
        Self {
            status: raw.status,
            request_id: raw.request_id,
            contract_amount: raw.contract_amount,
            balance: raw.balance,
            error: raw.error,
            error_description: raw.error_description,
        }
        .validate()
    }
}

impl From<PaymentRequestResult> for RawPaymentRequest {
    fn from(result: PaymentRequestResult) -> Self {
        Self {
            status: result.status,
            request_id: result.request_id,
            contract_amount: result.contract_amount,
            balance: result.balance,
            error: result.error,
            error_description: result.error_description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Success,
    Refused,
    InProgress,
    ExtAuthRequired,
}

/// Where the user must be sent to authorize the payment with their bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcsRedirect {
    pub uri: Url,
    pub params: ParameterMap,
}

/// Outcome of process-payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPaymentProcess", into = "RawPaymentProcess")]
pub struct PaymentProcessResult {
    status: ProcessStatus,
    payment_id: Option<String>,
    invoice_id: Option<String>,
    balance: Option<Amount>,
    error: Option<ErrorCode>,
    acs: Option<AcsRedirect>,
    next_retry_ms: Option<u64>,
}

impl PaymentProcessResult {
    pub fn success(payment_id: impl Into<String>) -> Self {
        Self {
            payment_id: Some(payment_id.into()),
            ..Self::bare(ProcessStatus::Success)
        }
    }

    pub fn refused(error: ErrorCode) -> Self {
        Self {
            error: Some(error),
            ..Self::bare(ProcessStatus::Refused)
        }
    }

    /// `next_retry_ms` falls back to [`DEFAULT_NEXT_RETRY_MS`].
    pub fn in_progress(next_retry_ms: Option<u64>) -> Self {
        Self {
            next_retry_ms: Some(next_retry_ms.unwrap_or(DEFAULT_NEXT_RETRY_MS)),
            ..Self::bare(ProcessStatus::InProgress)
        }
    }

    pub fn ext_auth_required(acs_uri: Url, acs_params: ParameterMap) -> Self {
        Self {
            acs: Some(AcsRedirect {
                uri: acs_uri,
                params: acs_params,
            }),
            ..Self::bare(ProcessStatus::ExtAuthRequired)
        }
    }

    fn bare(status: ProcessStatus) -> Self {
        Self {
            status,
            payment_id: None,
            invoice_id: None,
            balance: None,
            error: None,
            acs: None,
            next_retry_ms: None,
        }
    }

    pub fn with_invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self
    }

    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// SUCCESS and REFUSED end the payment; the other statuses call for `repeat()`.
    pub fn is_final(&self) -> bool {
        matches!(self.status, ProcessStatus::Success | ProcessStatus::Refused)
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice_id.as_deref()
    }

    pub fn balance(&self) -> Option<Amount> {
        self.balance
    }

    pub fn error(&self) -> Option<&ErrorCode> {
        self.error.as_ref()
    }

    pub fn acs_redirect(&self) -> Option<&AcsRedirect> {
        self.acs.as_ref()
    }

    /// Minimum wait before `repeat()`; present only while IN_PROGRESS.
    pub fn next_retry(&self) -> Option<Duration> {
        self.next_retry_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPaymentProcess {
    status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    balance: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acs_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "ParameterMap::is_empty")]
    acs_params: ParameterMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_retry: Option<u64>,
}

impl TryFrom<RawPaymentProcess> for PaymentProcessResult {
    type Error = PaymentError;

    fn try_from(raw: RawPaymentProcess) -> Result<Self> {
        const RESPONSE: &str = "process-payment";
        let mut result = Self {
            payment_id: raw.payment_id,
            invoice_id: raw.invoice_id,
            balance: raw.balance,
            ..Self::bare(raw.status)
        };
        match raw.status {
            ProcessStatus::Success => {}
            ProcessStatus::Refused => {
                result.error = Some(raw.error.ok_or(PaymentError::MissingField {
                    response: RESPONSE,
                    field: "error",
                })?);
            }
            ProcessStatus::InProgress => {
                result.next_retry_ms = Some(raw.next_retry.unwrap_or(DEFAULT_NEXT_RETRY_MS));
            }
            ProcessStatus::ExtAuthRequired => {
                let uri = raw.acs_uri.ok_or(PaymentError::MissingField {
                    response: RESPONSE,
                    field: "acs_uri",
                })?;
                result.acs = Some(AcsRedirect {
                    uri,
                    params: raw.acs_params,
                });
            }
        }
        Ok(result)
    }
}

impl From<PaymentProcessResult> for RawPaymentProcess {
    fn from(result: PaymentProcessResult) -> Self {
        let (acs_uri, acs_params) = match result.acs {
            Some(acs) => (Some(acs.uri), acs.params),
            None => (None, ParameterMap::new()),
        };
        Self {
            status: result.status,
            payment_id: result.payment_id,
            invoice_id: result.invoice_id,
            balance: result.balance,
            error: result.error,
            acs_uri,
            acs_params,
            next_retry: result.next_retry_ms,
        }
    }
}
