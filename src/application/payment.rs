use crate::config::PaymentConfig;
use crate::domain::payment::{
    MoneySource, ParameterProvider, PaymentContext, PaymentSnapshot, ProcessState,
};
use crate::domain::ports::{SharedExecutor, SharedInstanceIdProvider};
use crate::domain::request::{ApiRequest, Endpoint};
use crate::domain::results::{
    AcsRedirect, FromResponse, PaymentProcessResult, PaymentRequestResult, ProcessStatus,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// What distinguishes one kind of payment from another: the calls it issues.
///
/// Each hook is a pure function of the caller's parameters and the flavor's
/// own fixed settings.
#[async_trait]
pub trait PaymentFlavor: Send + Sync {
    fn context(&self) -> PaymentContext;

    /// Runs before every network call.
    async fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn request_payment_call(&self, provider: &dyn ParameterProvider) -> Result<ApiRequest>;

    fn process_payment_call(
        &self,
        provider: &dyn ParameterProvider,
        request_id: &str,
    ) -> Result<ApiRequest>;

    fn repeat_process_payment_call(
        &self,
        provider: &dyn ParameterProvider,
        request_id: &str,
    ) -> Result<ApiRequest> {
        self.process_payment_call(provider, request_id)
    }

    fn instance_id(&self) -> Option<&str> {
        None
    }

    fn restore_instance_id(&mut self, _instance_id: Option<String>) {}
}

/// Payments from the balance of an authorized wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletFlavor;

#[async_trait]
impl PaymentFlavor for WalletFlavor {
    fn context(&self) -> PaymentContext {
        PaymentContext::Wallet
    }

    fn request_payment_call(&self, provider: &dyn ParameterProvider) -> Result<ApiRequest> {
        Ok(ApiRequest::new(Endpoint::RequestPayment)
            .param("pattern_id", provider.pattern_id())
            .params(provider.payment_parameters()))
    }

    fn process_payment_call(
        &self,
        provider: &dyn ParameterProvider,
        request_id: &str,
    ) -> Result<ApiRequest> {
        let request = ApiRequest::new(Endpoint::ProcessPayment).param("request_id", request_id);
        let request = match provider.money_source() {
            MoneySource::Wallet => request.param("money_source", "wallet"),
            MoneySource::ExternalCard { token } => request
                .param("money_source", "card")
                .param("money_source_token", token),
        };
        Ok(request.param_opt("csc", provider.csc()))
    }
}

/// Anonymous card payments bound to an application instance.
pub struct ExternalFlavor {
    config: PaymentConfig,
    instance_ids: SharedInstanceIdProvider,
    instance_id: Option<String>,
}

impl ExternalFlavor {
    pub fn new(config: PaymentConfig, instance_ids: SharedInstanceIdProvider) -> Self {
        Self {
            config,
            instance_ids,
            instance_id: None,
        }
    }

    fn require_instance_id(&self) -> Result<&str> {
        self.instance_id.as_deref().ok_or_else(|| {
            PaymentError::InvalidState("instance id has not been obtained yet".to_string())
        })
    }
}

#[async_trait]
impl PaymentFlavor for ExternalFlavor {
    fn context(&self) -> PaymentContext {
        PaymentContext::External
    }

    async fn prepare(&mut self) -> Result<()> {
        if self.instance_id.is_none() {
            let instance_id = self.instance_ids.instance_id(&self.config.client_id).await?;
            debug!(%instance_id, "obtained instance id");
            self.instance_id = Some(instance_id);
        }
        Ok(())
    }

    fn request_payment_call(&self, provider: &dyn ParameterProvider) -> Result<ApiRequest> {
        Ok(ApiRequest::new(Endpoint::RequestExternalPayment)
            .param("instance_id", self.require_instance_id()?)
            .param("pattern_id", provider.pattern_id())
            .params(provider.payment_parameters()))
    }

    fn process_payment_call(
        &self,
        provider: &dyn ParameterProvider,
        request_id: &str,
    ) -> Result<ApiRequest> {
        let request = ApiRequest::new(Endpoint::ProcessExternalPayment)
            .param("request_id", request_id)
            .param("instance_id", self.require_instance_id()?)
            .param("ext_auth_success_uri", self.config.ext_auth_success_uri.as_str())
            .param("ext_auth_fail_uri", self.config.ext_auth_fail_uri.as_str());
        let request = match provider.money_source() {
            MoneySource::Wallet => request,
            MoneySource::ExternalCard { token } => request
                .param("money_source_token", token)
                .param_opt("csc", provider.csc()),
        };
        Ok(request)
    }

    fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    fn restore_instance_id(&mut self, instance_id: Option<String>) {
        if instance_id.is_some() {
            self.instance_id = instance_id;
        }
    }
}

/// Drives one payment from quote to completion, one network step per call.
///
/// `proceed()` first issues request-payment, then process-payment with the
/// obtained request id. `repeat()` re-issues process-payment for the same
/// request id, for IN_PROGRESS polling and after an ACS redirect. Errors
/// propagate and leave the recorded step results untouched, so the failed
/// call is simply made again on the next invocation.
pub struct PaymentOrchestrator<F: PaymentFlavor> {
    flavor: F,
    executor: SharedExecutor,
    state: ProcessState,
    request_result: Option<PaymentRequestResult>,
    process_result: Option<PaymentProcessResult>,
    process_attempts: u32,
}

pub type WalletPaymentOrchestrator = PaymentOrchestrator<WalletFlavor>;
pub type ExternalPaymentOrchestrator = PaymentOrchestrator<ExternalFlavor>;

impl PaymentOrchestrator<WalletFlavor> {
    pub fn new(executor: SharedExecutor) -> Self {
        Self::with_flavor(WalletFlavor, executor)
    }
}

impl PaymentOrchestrator<ExternalFlavor> {
    pub fn new(
        executor: SharedExecutor,
        instance_ids: SharedInstanceIdProvider,
        config: PaymentConfig,
    ) -> Self {
        Self::with_flavor(ExternalFlavor::new(config, instance_ids), executor)
    }
}

impl<F: PaymentFlavor> PaymentOrchestrator<F> {
    pub fn with_flavor(flavor: F, executor: SharedExecutor) -> Self {
        Self {
            flavor,
            executor,
            state: ProcessState::Created,
            request_result: None,
            process_result: None,
            process_attempts: 0,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn context(&self) -> PaymentContext {
        self.flavor.context()
    }

    pub fn request_result(&self) -> Option<&PaymentRequestResult> {
        self.request_result.as_ref()
    }

    pub fn process_result(&self) -> Option<&PaymentProcessResult> {
        self.process_result.as_ref()
    }

    /// Minimum wait before the next `repeat()` while the payment is IN_PROGRESS.
    pub fn next_retry(&self) -> Option<Duration> {
        self.process_result.as_ref()?.next_retry()
    }

    /// Redirect target while the payment awaits external authorization.
    pub fn acs_redirect(&self) -> Option<&AcsRedirect> {
        self.process_result.as_ref()?.acs_redirect()
    }

    /// Performs the next step. Returns `true` once the caller has nothing to
    /// proceed with: the payment completed, was refused, or awaits an ACS
    /// redirect (continue with `repeat()` afterwards).
    #[instrument(skip_all, fields(context = ?self.flavor.context(), state = ?self.state))]
    pub async fn proceed(&mut self, provider: &dyn ParameterProvider) -> Result<bool> {
        match self.state {
            ProcessState::Completed => Ok(true),
            ProcessState::Created => self.request_payment(provider).await,
            ProcessState::Started => {
                if let Some(result) = &self.process_result {
                    return Err(PaymentError::InvalidState(format!(
                        "process-payment already answered {:?}, use repeat()",
                        result.status()
                    )));
                }
                if self.request_result.is_none() {
                    self.request_payment(provider).await
                } else {
                    self.process_payment(provider, false).await
                }
            }
        }
    }

    /// Re-issues process-payment for the request obtained earlier.
    #[instrument(skip_all, fields(context = ?self.flavor.context(), attempts = self.process_attempts))]
    pub async fn repeat(&mut self, provider: &dyn ParameterProvider) -> Result<bool> {
        match self.state {
            ProcessState::Completed => Ok(true),
            _ if self.process_attempts == 0 => Err(PaymentError::InvalidState(
                "repeat() requires a prior process-payment attempt".to_string(),
            )),
            _ => self.process_payment(provider, true).await,
        }
    }

    /// Discards all progress. The instance id, if any, is kept.
    pub fn reset(&mut self) {
        self.state = ProcessState::Created;
        self.request_result = None;
        self.process_result = None;
        self.process_attempts = 0;
    }

    pub fn save(&self) -> PaymentSnapshot {
        PaymentSnapshot {
            state: self.state,
            request_result: self.request_result.clone(),
            process_result: self.process_result.clone(),
            process_attempts: self.process_attempts,
            instance_id: self.flavor.instance_id().map(str::to_owned),
        }
    }

    pub fn restore(&mut self, snapshot: PaymentSnapshot) -> Result<()> {
        check_snapshot(&snapshot)?;
        self.state = snapshot.state;
        self.request_result = snapshot.request_result;
        self.process_result = snapshot.process_result;
        self.process_attempts = snapshot.process_attempts;
        self.flavor.restore_instance_id(snapshot.instance_id);
        Ok(())
    }

    async fn request_payment(&mut self, provider: &dyn ParameterProvider) -> Result<bool> {
        self.flavor.prepare().await?;
        let request = self.flavor.request_payment_call(provider)?;
        self.state = ProcessState::Started;

        let result: PaymentRequestResult = self.execute(request).await?;
        let refused = !result.is_payable();
        if refused {
            info!(error = ?result.error(), "request-payment refused");
            self.state = ProcessState::Completed;
        } else {
            debug!(
                request_id = ?result.request_id(),
                amount = ?result.contract_amount(),
                status = ?result.status(),
                "request-payment accepted"
            );
        }
        self.request_result = Some(result);
        Ok(refused)
    }

    async fn process_payment(
        &mut self,
        provider: &dyn ParameterProvider,
        repeat: bool,
    ) -> Result<bool> {
        let request_id = self
            .request_result
            .as_ref()
            .and_then(PaymentRequestResult::request_id)
            .map(str::to_owned)
            .ok_or_else(|| {
                PaymentError::InvalidState("no request id to process".to_string())
            })?;

        self.flavor.prepare().await?;
        let request = if repeat {
            self.flavor.repeat_process_payment_call(provider, &request_id)?
        } else {
            self.flavor.process_payment_call(provider, &request_id)?
        };
        self.process_attempts += 1;

        let result: PaymentProcessResult = self.execute(request).await?;
        let done = match result.status() {
            ProcessStatus::Success | ProcessStatus::Refused => {
                info!(%request_id, status = ?result.status(), error = ?result.error(), "payment completed");
                self.state = ProcessState::Completed;
                true
            }
            ProcessStatus::ExtAuthRequired => {
                info!(%request_id, "payment awaits external authorization");
                true
            }
            ProcessStatus::InProgress => {
                debug!(%request_id, next_retry = ?result.next_retry(), "payment in progress");
                false
            }
        };
        self.process_result = Some(result);
        Ok(done)
    }

    async fn execute<T: FromResponse>(&self, request: ApiRequest) -> Result<T> {
        let endpoint = request.endpoint.path().to_string();
        let body = self.executor.execute(request).await.inspect_err(|e| {
            warn!(%endpoint, error = %e, "call failed");
        })?;
        T::from_response(body).inspect_err(|e| {
            warn!(%endpoint, error = %e, "unexpected answer");
        })
    }
}

pub(crate) fn check_snapshot(snapshot: &PaymentSnapshot) -> Result<()> {
    let request = snapshot.request_result.as_ref();
    let process = snapshot.process_result.as_ref();
    let consistent = match snapshot.state {
        ProcessState::Created => {
            request.is_none() && process.is_none() && snapshot.process_attempts == 0
        }
        ProcessState::Started => match (request, process) {
            (None, None) => snapshot.process_attempts == 0,
            (Some(request), None) => request.is_payable(),
            (Some(request), Some(process)) => {
                request.is_payable() && !process.is_final() && snapshot.process_attempts > 0
            }
            (None, Some(_)) => false,
        },
        ProcessState::Completed => match (request, process) {
            (Some(request), None) => !request.is_payable(),
            (Some(request), Some(process)) => request.is_payable() && process.is_final(),
            (None, _) => false,
        },
    };
    if consistent {
        Ok(())
    } else {
        Err(PaymentError::Format(format!(
            "snapshot in state {:?} has inconsistent step results",
            snapshot.state
        )))
    }
}
