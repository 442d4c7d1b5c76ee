//! Headless walk through a card payment that needs 3DS2 authentication.
//!
//! The payment session and the native authenticator are simulated in memory, so the demo runs
//! without network access or a device.

use std::{collections::VecDeque, path::PathBuf, sync::Arc};

use anyhow::Context;
use checkout_sdk::{
    authenticator::{AuthenticatorProvider, ChallengeResult, ThreeDs2Authenticator},
    configs::Config,
    connector::PaymentConnector,
    error::ThreeDs2Error,
    logger, PaymentHandler,
};
use clap::{Parser, ValueEnum};
use common_utils::CustomResult;
use domain_types::{
    authentication::PaymentsDetailsRequest,
    configuration::Configuration,
    errors::ApiClientError,
    payment::{PaymentReference, PaymentsRequest},
};
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Debug, Parser)]
#[command(about = "Run a simulated checkout payment")]
struct Args {
    /// Configuration file, defaults to config/<env>.toml in the workspace
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Scenario::Challenge)]
    scenario: Scenario,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Fingerprint followed by a challenge
    Challenge,
    /// Frictionless flow, the fingerprint is enough
    Frictionless,
    /// The issuer refuses after the challenge
    Refused,
}

/// Simulated payment session answering from a script.
struct SimulatedSession {
    responses: Mutex<VecDeque<Value>>,
}

impl SimulatedSession {
    fn new(scenario: Scenario) -> Self {
        let fingerprint = json!({
            "resultCode": "IdentifyShopper",
            "action": {"type": "threeDS2Fingerprint", "paymentData": "pd-1", "token": "eyJ0aHJlZURTTWV0aG9kVXJsIjoiIn0="}
        });
        let challenge = json!({
            "resultCode": "ChallengeShopper",
            "action": {"type": "threeDS2Challenge", "paymentData": "pd-2", "token": "eyJhY3NVUkwiOiIifQ=="}
        });
        let authorised = json!({"resultCode": "Authorised", "pspReference": "8835511210681145"});
        let refused = json!({"resultCode": "Refused", "refusalReason": "3D Not Authenticated"});

        let responses = match scenario {
            Scenario::Challenge => vec![fingerprint, challenge, authorised],
            Scenario::Frictionless => vec![fingerprint, authorised],
            Scenario::Refused => vec![fingerprint, challenge, refused],
        };
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    async fn next(&self) -> CustomResult<Value, ApiClientError> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or(error_stack::report!(ApiClientError::UnexpectedServerResponse))
    }
}

#[async_trait::async_trait]
impl PaymentConnector for SimulatedSession {
    async fn payments(
        &self,
        configuration: &Configuration,
        request: &PaymentsRequest,
    ) -> CustomResult<Value, ApiClientError> {
        tracing::info!(
            base_url = configuration.base_url(),
            reference = %request.reference,
            "POST /payments"
        );
        self.next().await
    }

    async fn payments_details(
        &self,
        configuration: &Configuration,
        request: &PaymentsDetailsRequest,
    ) -> CustomResult<Value, ApiClientError> {
        tracing::info!(
            base_url = configuration.base_url(),
            details = request.details.kind(),
            "POST /payments/details"
        );
        self.next().await
    }
}

#[derive(Default)]
struct SimulatedAuthenticator {
    released: bool,
}

#[async_trait::async_trait]
impl ThreeDs2Authenticator for SimulatedAuthenticator {
    async fn create_fingerprint(&mut self, token: &str) -> CustomResult<String, ThreeDs2Error> {
        tracing::info!(token, "collecting device fingerprint");
        Ok(format!("fingerprint:{}", token.len()))
    }

    async fn present_challenge(
        &mut self,
        token: &str,
    ) -> CustomResult<ChallengeResult, ThreeDs2Error> {
        tracing::info!(token, "shopper completes the challenge");
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        Ok(ChallengeResult {
            payload: "eyJ0cmFuc1N0YXR1cyI6IlkifQ==".to_string(),
        })
    }

    fn release(&mut self) {
        tracing::info!("authenticator released");
        self.released = true;
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

struct SimulatedProvider;

impl AuthenticatorProvider for SimulatedProvider {
    fn acquire(&self) -> CustomResult<Box<dyn ThreeDs2Authenticator>, ThreeDs2Error> {
        Ok(Box::new(SimulatedAuthenticator::default()))
    }
}

#[allow(clippy::print_stdout)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::new_with_config_path(args.config).context("loading configuration")?;
    let _guard = logger::setup(&config.log, "example-rs", ["example_rs"])?;
    let configuration = config.checkout.configuration()?;

    let reference = PaymentReference::new(configuration, None);
    let handler = PaymentHandler::builder(Arc::new(SimulatedSession::new(args.scenario)))
        .reference(reference)
        .authenticator_provider(Arc::new(SimulatedProvider))
        .build()?;

    let mut errors = handler.errors();
    tokio::spawn(async move {
        while let Some(error) = errors.recv().await {
            tracing::warn!(message = error.message(), "shown to the shopper");
        }
    });

    let mut outcomes = handler.payment_result();
    handler
        .submit_payment(json!({"type": "scheme", "encryptedCardNumber": "test_4917610000000000"}))
        .await;

    let outcome = outcomes
        .recv()
        .await
        .context("payment finished without an outcome")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
