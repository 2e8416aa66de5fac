use crate::domain::ports::SharedExecutor;
use crate::domain::request::{ApiRequest, Endpoint, ParameterMap};
use crate::domain::showcase::{
    NavState, ShowcaseForm, ShowcaseResponse, ShowcaseSession, ShowcaseStep,
};
use crate::error::{PaymentError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

/// Walks the user through a server-defined multi-step form.
///
/// `proceed()` submits the current step and moves forward on success;
/// `back()` returns to the previous step without touching the network.
pub struct ShowcaseNavigator<F> {
    executor: SharedExecutor,
    session: ShowcaseSession<F>,
}

impl<F> ShowcaseNavigator<F>
where
    F: ShowcaseForm + Clone + DeserializeOwned + Send + Sync,
{
    pub fn new(
        executor: SharedExecutor,
        first_step: ShowcaseStep<F>,
        hidden_fields: ParameterMap,
    ) -> Self {
        Self::restore(executor, ShowcaseSession::new(first_step, hidden_fields))
    }

    /// Resumes a previously saved session.
    pub fn restore(executor: SharedExecutor, session: ShowcaseSession<F>) -> Self {
        Self { executor, session }
    }

    pub fn session(&self) -> &ShowcaseSession<F> {
        &self.session
    }

    pub fn into_session(self) -> ShowcaseSession<F> {
        self.session
    }

    pub fn state(&self) -> NavState {
        self.session.state()
    }

    pub fn current_step(&self) -> &ShowcaseStep<F> {
        self.session.current_step()
    }

    /// Lets the caller edit the form of the current step before submitting it.
    pub fn current_form_mut(&mut self) -> &mut F {
        self.session.current_form_mut()
    }

    /// Submits the current step. Returns `true` once no form is left to fill.
    ///
    /// A locally invalid form is rejected without a network call.
    #[instrument(skip_all, fields(step_url = %self.session.current_step().step_url, history = self.session.history().len()))]
    pub async fn proceed(&mut self) -> Result<bool> {
        if self.session.state() == NavState::Completed {
            return Ok(true);
        }
        if !self.session.current_step().form.is_valid() {
            debug!("form is invalid, not submitting");
            self.session.reject(Vec::new());
            return Ok(false);
        }

        let step_url = self.session.current_step().step_url.clone();
        let request = ApiRequest::new(Endpoint::Showcase(step_url)).params(self.session.submission());
        let body = self.executor.execute(request).await?;
        let response: ShowcaseResponse<F> = serde_json::from_value(body)
            .map_err(|e| PaymentError::InvalidResponse(format!("showcase step: {e}")))?;

        let completed = self.session.apply(response);
        match self.session.state() {
            NavState::Completed => info!("showcase completed"),
            NavState::InvalidParams => {
                debug!(errors = self.session.errors().len(), "server rejected parameters")
            }
            NavState::Unknown => debug!(step_url = %self.session.current_step().step_url, "moved to next step"),
        }
        Ok(completed)
    }

    /// Returns to the previous step. Never fails and never goes to the network.
    pub fn back(&mut self) {
        self.session.back();
    }
}
