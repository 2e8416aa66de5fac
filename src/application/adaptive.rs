use super::payment::{ExternalPaymentOrchestrator, WalletPaymentOrchestrator, check_snapshot};
use crate::config::PaymentConfig;
use crate::domain::payment::{ParameterProvider, PaymentContext, PaymentSnapshot, ProcessState};
use crate::domain::ports::{SharedExecutor, SharedInstanceIdProvider};
use crate::domain::results::{AcsRedirect, PaymentProcessResult, PaymentRequestResult};
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

const PINNED_FLAG: i32 = 10;

/// Packs `(context, pinned)` as `ordinal + (pinned ? 10 : 0)`.
///
/// This layout is what previously persisted sessions contain; keep it stable.
pub fn encode_flags(context: PaymentContext, pinned: bool) -> i32 {
    context.ordinal() as i32 + if pinned { PINNED_FLAG } else { 0 }
}

pub fn decode_flags(flags: i32) -> Result<(PaymentContext, bool)> {
    if flags < 0 {
        return Err(PaymentError::Format(format!("negative context flags {flags}")));
    }
    let context = PaymentContext::from_ordinal((flags % PINNED_FLAG) as u32).ok_or_else(|| {
        PaymentError::Format(format!("unknown payment context in flags {flags}"))
    })?;
    let pinned = match (flags / PINNED_FLAG) % 10 {
        0 => false,
        1 => true,
        _ => {
            return Err(PaymentError::Format(format!(
                "invalid pinned marker in flags {flags}"
            )));
        }
    };
    Ok((context, pinned))
}

/// Saved progress of an [`AdaptivePaymentOrchestrator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSnapshot {
    pub wallet: PaymentSnapshot,
    pub external: PaymentSnapshot,
    pub flags: i32,
}

/// Picks between wallet and external card payments as the payer decides.
///
/// Starts in the wallet context when the session is authorized, otherwise in
/// the external one. Once the active payment has started, choosing a money
/// source that belongs to the other context switches over, and the newly
/// active payment starts afresh. `pin_context` disables switching.
pub struct AdaptivePaymentOrchestrator {
    wallet: WalletPaymentOrchestrator,
    external: ExternalPaymentOrchestrator,
    context: PaymentContext,
    pinned: bool,
}

impl AdaptivePaymentOrchestrator {
    pub fn new(
        executor: SharedExecutor,
        instance_ids: SharedInstanceIdProvider,
        config: PaymentConfig,
    ) -> Self {
        let context = if executor.is_authorized() {
            PaymentContext::Wallet
        } else {
            PaymentContext::External
        };
        Self {
            wallet: WalletPaymentOrchestrator::new(executor.clone()),
            external: ExternalPaymentOrchestrator::new(executor, instance_ids, config),
            context,
            pinned: false,
        }
    }

    pub fn context(&self) -> PaymentContext {
        self.context
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// State of the payment in the active context.
    pub fn state(&self) -> ProcessState {
        match self.context {
            PaymentContext::Wallet => self.wallet.state(),
            PaymentContext::External => self.external.state(),
        }
    }

    pub fn request_result(&self) -> Option<&PaymentRequestResult> {
        match self.context {
            PaymentContext::Wallet => self.wallet.request_result(),
            PaymentContext::External => self.external.request_result(),
        }
    }

    pub fn process_result(&self) -> Option<&PaymentProcessResult> {
        match self.context {
            PaymentContext::Wallet => self.wallet.process_result(),
            PaymentContext::External => self.external.process_result(),
        }
    }

    pub fn next_retry(&self) -> Option<Duration> {
        self.process_result()?.next_retry()
    }

    pub fn acs_redirect(&self) -> Option<&AcsRedirect> {
        self.process_result()?.acs_redirect()
    }

    /// Fixes the context for the whole attempt. Only allowed before the first step.
    pub fn pin_context(&mut self, context: PaymentContext) -> Result<()> {
        if self.state() != ProcessState::Created {
            return Err(PaymentError::InvalidState(format!(
                "cannot pin context once the payment is {:?}",
                self.state()
            )));
        }
        self.context = context;
        self.pinned = true;
        Ok(())
    }

    #[instrument(skip_all, fields(context = ?self.context, pinned = self.pinned))]
    pub async fn proceed(&mut self, provider: &dyn ParameterProvider) -> Result<bool> {
        if let Some(target) = self.switch_target(provider) {
            self.switch_context(target);
        }
        match self.context {
            PaymentContext::Wallet => self.wallet.proceed(provider).await,
            PaymentContext::External => self.external.proceed(provider).await,
        }
    }

    /// Repeats process-payment in the active context.
    ///
    /// A switched-to payment starts afresh and has nothing to repeat, so a
    /// money source from the other context is rejected here and nothing
    /// changes. Use `proceed()` to switch.
    #[instrument(skip_all, fields(context = ?self.context, pinned = self.pinned))]
    pub async fn repeat(&mut self, provider: &dyn ParameterProvider) -> Result<bool> {
        if let Some(target) = self.switch_target(provider) {
            return Err(PaymentError::InvalidState(format!(
                "money source belongs to {target:?} context while the {:?} payment is in flight, use proceed() to switch",
                self.context
            )));
        }
        match self.context {
            PaymentContext::Wallet => self.wallet.repeat(provider).await,
            PaymentContext::External => self.external.repeat(provider).await,
        }
    }

    /// Discards the progress of both payments. Context and pin are kept.
    pub fn reset(&mut self) {
        self.wallet.reset();
        self.external.reset();
    }

    pub fn save(&self) -> AdaptiveSnapshot {
        AdaptiveSnapshot {
            wallet: self.wallet.save(),
            external: self.external.save(),
            flags: encode_flags(self.context, self.pinned),
        }
    }

    /// Restores saved progress. Nothing changes if any part is malformed.
    pub fn restore(&mut self, snapshot: AdaptiveSnapshot) -> Result<()> {
        let (context, pinned) = decode_flags(snapshot.flags)?;
        check_snapshot(&snapshot.wallet)?;
        check_snapshot(&snapshot.external)?;
        self.wallet.restore(snapshot.wallet)?;
        self.external.restore(snapshot.external)?;
        self.context = context;
        self.pinned = pinned;
        Ok(())
    }

    /// The context to switch to, if the chosen money source requires one.
    fn switch_target(&self, provider: &dyn ParameterProvider) -> Option<PaymentContext> {
        if self.pinned || self.state() != ProcessState::Started {
            return None;
        }
        let target = provider.money_source().context();
        (target != self.context).then_some(target)
    }

    fn switch_context(&mut self, target: PaymentContext) {
        info!(from = ?self.context, to = ?target, "money source belongs to other context, switching");
        self.context = target;
        match target {
            PaymentContext::Wallet => self.wallet.reset(),
            PaymentContext::External => self.external.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{MoneySource, PaymentParameters};
    use crate::domain::request::{Endpoint, ParameterMap};
    use crate::infrastructure::scripted::ScriptedExecutor;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    fn adaptive(executor: &ScriptedExecutor) -> AdaptivePaymentOrchestrator {
        let config = PaymentConfig::new(
            "client-1",
            Url::parse("https://shop.example/success").unwrap(),
            Url::parse("https://shop.example/fail").unwrap(),
        )
        .unwrap();
        AdaptivePaymentOrchestrator::new(
            Arc::new(executor.clone()),
            Arc::new(executor.clone()),
            config,
        )
    }

    fn params(money_source: MoneySource) -> PaymentParameters {
        PaymentParameters::new(
            "p2p",
            ParameterMap::from([("amount".to_string(), "10.00".to_string())]),
        )
        .with_money_source(money_source)
    }

    fn quote(request_id: &str) -> serde_json::Value {
        json!({ "status": "success", "request_id": request_id, "contract_amount": "10.00" })
    }

    #[test]
    fn test_flags_roundtrip() {
        for context in [PaymentContext::Wallet, PaymentContext::External] {
            for pinned in [false, true] {
                assert_eq!(
                    decode_flags(encode_flags(context, pinned)).unwrap(),
                    (context, pinned)
                );
            }
        }
        assert_eq!(encode_flags(PaymentContext::External, true), 11);
    }

    #[test]
    fn test_decode_flags_rejects_garbage() {
        for flags in [2, 9, 12, 20, 21, -1] {
            assert!(
                matches!(decode_flags(flags), Err(PaymentError::Format(_))),
                "flags {flags}"
            );
        }
    }

    #[test]
    fn test_initial_context_follows_authorization() {
        assert_eq!(
            adaptive(&ScriptedExecutor::authorized()).context(),
            PaymentContext::Wallet
        );
        assert_eq!(
            adaptive(&ScriptedExecutor::anonymous()).context(),
            PaymentContext::External
        );
    }

    #[tokio::test]
    async fn test_switches_to_external_once() {
        let executor = ScriptedExecutor::authorized();
        executor
            .respond(quote("w1"))
            .respond(quote("e1"))
            .respond(json!({ "status": "in_progress" }));
        let mut payment = adaptive(&executor);
        let card = params(MoneySource::external_card("tok"));

        payment.proceed(&params(MoneySource::Wallet)).await.unwrap();
        assert_eq!(payment.state(), ProcessState::Started);

        assert!(!payment.proceed(&card).await.unwrap());
        assert_eq!(payment.context(), PaymentContext::External);
        assert_eq!(
            executor.calls()[1].endpoint,
            Endpoint::RequestExternalPayment
        );

        assert!(!payment.proceed(&card).await.unwrap());
        assert_eq!(payment.context(), PaymentContext::External);
        assert_eq!(
            executor.calls()[2].endpoint,
            Endpoint::ProcessExternalPayment
        );
        assert_eq!(executor.calls()[2].params["request_id"], "e1");
    }

    #[tokio::test]
    async fn test_pinned_context_never_switches() {
        let executor = ScriptedExecutor::authorized();
        executor
            .respond(quote("w1"))
            .respond(json!({ "status": "success" }));
        let mut payment = adaptive(&executor);
        payment.pin_context(PaymentContext::Wallet).unwrap();
        let card = params(MoneySource::external_card("tok"));

        payment.proceed(&card).await.unwrap();
        assert!(payment.proceed(&card).await.unwrap());
        assert_eq!(payment.context(), PaymentContext::Wallet);
        assert_eq!(executor.calls()[1].endpoint, Endpoint::ProcessPayment);
    }

    #[tokio::test]
    async fn test_pin_after_start_is_rejected() {
        let executor = ScriptedExecutor::authorized();
        executor.respond(quote("w1"));
        let mut payment = adaptive(&executor);
        payment.proceed(&params(MoneySource::Wallet)).await.unwrap();

        assert!(matches!(
            payment.pin_context(PaymentContext::External),
            Err(PaymentError::InvalidState(_))
        ));
        assert!(!payment.is_pinned());
    }

    #[tokio::test]
    async fn test_save_restore_keeps_context_and_pin() {
        let executor = ScriptedExecutor::anonymous();
        executor.respond(quote("e1"));
        let mut payment = adaptive(&executor);
        payment.pin_context(PaymentContext::External).unwrap();
        payment.proceed(&params(MoneySource::Wallet)).await.unwrap();

        let snapshot = payment.save();
        assert_eq!(snapshot.flags, 11);
        let json = serde_json::to_value(&snapshot).unwrap();

        let mut restored = adaptive(&ScriptedExecutor::authorized());
        restored
            .restore(serde_json::from_value(json).unwrap())
            .unwrap();
        assert_eq!(restored.context(), PaymentContext::External);
        assert!(restored.is_pinned());
        assert_eq!(restored.request_result().unwrap().request_id(), Some("e1"));
    }

    #[tokio::test]
    async fn test_repeat_with_other_context_money_source_changes_nothing() {
        let executor = ScriptedExecutor::authorized();
        executor
            .respond(quote("w1"))
            .respond(json!({ "status": "in_progress" }))
            .respond(json!({ "status": "success" }));
        let mut payment = adaptive(&executor);
        let wallet = params(MoneySource::Wallet);
        payment.proceed(&wallet).await.unwrap();
        assert!(!payment.proceed(&wallet).await.unwrap());
        let before = payment.save();

        let err = payment
            .repeat(&params(MoneySource::external_card("tok")))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidState(_)), "{err}");
        assert_eq!(payment.context(), PaymentContext::Wallet);
        assert_eq!(payment.save(), before);
        assert_eq!(executor.call_count(), 2);

        assert!(payment.repeat(&wallet).await.unwrap());
        assert_eq!(payment.state(), ProcessState::Completed);
        assert_eq!(executor.calls()[2].endpoint, Endpoint::ProcessPayment);
        assert_eq!(executor.calls()[2].params["request_id"], "w1");
    }

    #[test]
    fn test_restore_with_bad_flags_changes_nothing() {
        let executor = ScriptedExecutor::authorized();
        let mut payment = adaptive(&executor);
        let mut snapshot = payment.save();
        snapshot.flags = 37;

        assert!(matches!(
            payment.restore(snapshot),
            Err(PaymentError::Format(_))
        ));
        assert_eq!(payment.context(), PaymentContext::Wallet);
        assert!(!payment.is_pinned());
    }
}
