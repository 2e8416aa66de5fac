#![allow(dead_code)]

use payflow::config::PaymentConfig;
use payflow::domain::payment::{MoneySource, PaymentParameters};
use payflow::domain::request::ParameterMap;
use payflow::domain::showcase::{ShowcaseForm, ShowcaseStep};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use url::Url;

/// A flat form whose validity is decided by the test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestForm {
    pub fields: ParameterMap,
    #[serde(default = "valid_by_default")]
    pub valid: bool,
}

fn valid_by_default() -> bool {
    true
}

impl ShowcaseForm for TestForm {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn collect_parameters(&self) -> ParameterMap {
        self.fields.clone()
    }
}

pub fn step(name: &str, valid: bool) -> ShowcaseStep<TestForm> {
    ShowcaseStep::new(
        TestForm {
            fields: ParameterMap::from([("field".to_string(), name.to_string())]),
            valid,
        },
        step_url(name),
    )
}

pub fn step_url(name: &str) -> Url {
    Url::parse(&format!("https://showcase.example/923/{name}")).unwrap()
}

pub fn next_step_response(name: &str) -> Value {
    json!({
        "kind": "next_step",
        "step_url": step_url(name).as_str(),
        "form": { "fields": { "field": name } },
        "hidden_fields": { "scid": "923" }
    })
}

pub fn config() -> PaymentConfig {
    PaymentConfig::new(
        "client-1",
        Url::parse("https://shop.example/success").unwrap(),
        Url::parse("https://shop.example/fail").unwrap(),
    )
    .unwrap()
}

pub fn payment_params(money_source: MoneySource) -> PaymentParameters {
    PaymentParameters::new(
        "p2p",
        ParameterMap::from([
            ("to".to_string(), "410011161616877".to_string()),
            ("amount_due".to_string(), "10.00".to_string()),
        ]),
    )
    .with_money_source(money_source)
}

pub fn quote(request_id: &str) -> Value {
    json!({ "status": "success", "request_id": request_id, "contract_amount": "10.00" })
}

/// Routes engine logs to the test output; set `RUST_LOG=payflow=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
