//! Data model of a server-driven, multi-step input form ("showcase").
//!
//! The form contents are opaque: anything implementing [`ShowcaseForm`] can be
//! walked, as long as it can be validated locally and flattened into
//! parameters.

use super::payment::PaymentParameters;
use super::request::ParameterMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A form produced by the excluded form model.
pub trait ShowcaseForm {
    fn is_valid(&self) -> bool;
    fn collect_parameters(&self) -> ParameterMap;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcaseStep<F> {
    pub form: F,
    pub step_url: Url,
}

impl<F> ShowcaseStep<F> {
    pub fn new(form: F, step_url: Url) -> Self {
        Self { form, step_url }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    #[default]
    Unknown,
    InvalidParams,
    Completed,
}

/// A step the server accepted, with the hidden fields it was submitted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassedStep<F> {
    pub step: ShowcaseStep<F>,
    #[serde(default)]
    pub hidden_fields: ParameterMap,
}

/// A server-side complaint about one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

/// Already-classified answer to a step submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShowcaseResponse<F> {
    NextStep {
        step_url: Url,
        form: F,
        #[serde(default)]
        hidden_fields: ParameterMap,
    },
    Completed {
        params: ParameterMap,
    },
    InvalidParams {
        #[serde(default)]
        errors: Vec<FieldError>,
    },
}

/// Long-lived wizard progress. Plain data, so hosts can persist it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcaseSession<F> {
    history: Vec<PassedStep<F>>,
    current_step: ShowcaseStep<F>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    hidden_fields: ParameterMap,
    #[serde(default)]
    state: NavState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment_parameters: Option<ParameterMap>,
}

impl<F> ShowcaseSession<F> {
    pub fn new(first_step: ShowcaseStep<F>, hidden_fields: ParameterMap) -> Self {
        Self {
            history: Vec::new(),
            current_step: first_step,
            created_at: Utc::now(),
            hidden_fields,
            state: NavState::Unknown,
            errors: Vec::new(),
            payment_parameters: None,
        }
    }

    pub fn history(&self) -> &[PassedStep<F>] {
        &self.history
    }

    pub fn current_step(&self) -> &ShowcaseStep<F> {
        &self.current_step
    }

    pub fn current_form_mut(&mut self) -> &mut F {
        &mut self.current_step.form
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn hidden_fields(&self) -> &ParameterMap {
        &self.hidden_fields
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Field errors from the last rejected submission.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Final payment parameters, once the wizard completed.
    pub fn payment_parameters(&self) -> Option<&ParameterMap> {
        self.payment_parameters.as_ref()
    }

    /// Builds the inputs for a payment from a completed wizard.
    pub fn to_payment_parameters(&self, pattern_id: &str) -> Option<PaymentParameters> {
        self.payment_parameters
            .as_ref()
            .map(|params| PaymentParameters::new(pattern_id, params.clone()))
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Marks the current submission as rejected without touching the steps.
    pub fn reject(&mut self, errors: Vec<FieldError>) {
        self.state = NavState::InvalidParams;
        self.errors = errors;
    }

    /// Returns to the previously passed step along with its hidden fields.
    /// No-op on the first step.
    pub fn back(&mut self) {
        if let Some(previous) = self.history.pop() {
            self.current_step = previous.step;
            self.hidden_fields = previous.hidden_fields;
            self.state = NavState::Unknown;
            self.errors.clear();
            self.payment_parameters = None;
        }
    }
}

impl<F: ShowcaseForm> ShowcaseSession<F> {
    /// Parameters to submit for the current step; hidden fields win on conflict.
    pub fn submission(&self) -> ParameterMap {
        let mut params = self.current_step.form.collect_parameters();
        params.extend(
            self.hidden_fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        params
    }
}

impl<F: Clone> ShowcaseSession<F> {
    /// Applies a server answer; returns `true` once the wizard is complete.
    ///
    /// The current step is pushed onto the history only when the server
    /// accepted it.
    pub fn apply(&mut self, response: ShowcaseResponse<F>) -> bool {
        match response {
            ShowcaseResponse::NextStep {
                step_url,
                form,
                hidden_fields,
            } => {
                let step =
                    std::mem::replace(&mut self.current_step, ShowcaseStep::new(form, step_url));
                let hidden_fields = std::mem::replace(&mut self.hidden_fields, hidden_fields);
                self.history.push(PassedStep {
                    step,
                    hidden_fields,
                });
                self.state = NavState::Unknown;
                self.errors.clear();
                false
            }
            ShowcaseResponse::Completed { params } => {
                self.history.push(PassedStep {
                    step: self.current_step.clone(),
                    hidden_fields: self.hidden_fields.clone(),
                });
                self.payment_parameters = Some(params);
                self.state = NavState::Completed;
                self.errors.clear();
                true
            }
            ShowcaseResponse::InvalidParams { errors } => {
                self.reject(errors);
                false
            }
        }
    }
}
