#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use checkout_sdk::{
    authenticator::{AuthenticatorProvider, ChallengeResult, ThreeDs2Authenticator},
    connector::PaymentConnector,
    error::ThreeDs2Error,
    PaymentHandler,
};
use common_utils::CustomResult;
use domain_types::{
    authentication::PaymentsDetailsRequest,
    configuration::Configuration,
    errors::ApiClientError,
    payment::{PaymentReference, PaymentsRequest},
};
use error_stack::report;
use serde_json::{json, Value};

/// Connector answering from a queue of canned responses and recording every request body.
#[derive(Default)]
pub struct MockConnector {
    responses: Mutex<VecDeque<Result<Value, ApiClientError>>>,
    pub payments: Mutex<Vec<Value>>,
    pub details: Mutex<Vec<Value>>,
}

impl MockConnector {
    pub fn with_responses(responses: impl IntoIterator<Item = Value>) -> Arc<Self> {
        let connector = Self::default();
        connector
            .responses
            .lock()
            .unwrap()
            .extend(responses.into_iter().map(Ok));
        Arc::new(connector)
    }

    pub fn push_failure(&self, error: ApiClientError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn push_response(&self, response: Value) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn submitted_details(&self) -> Vec<Value> {
        self.details.lock().unwrap().clone()
    }

    fn next_response(&self) -> CustomResult<Value, ApiClientError> {
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(report!(error)),
            None => Err(report!(ApiClientError::UnexpectedServerResponse)
                .attach_printable("no canned response left")),
        }
    }
}

#[async_trait::async_trait]
impl PaymentConnector for MockConnector {
    async fn payments(
        &self,
        _configuration: &Configuration,
        request: &PaymentsRequest,
    ) -> CustomResult<Value, ApiClientError> {
        self.payments
            .lock()
            .unwrap()
            .push(serde_json::to_value(request).unwrap());
        self.next_response()
    }

    async fn payments_details(
        &self,
        _configuration: &Configuration,
        request: &PaymentsDetailsRequest,
    ) -> CustomResult<Value, ApiClientError> {
        self.details
            .lock()
            .unwrap()
            .push(serde_json::to_value(request).unwrap());
        self.next_response()
    }
}

/// Authenticator provider whose instances follow a shared script and count their lifecycle.
#[derive(Default)]
pub struct MockAuthenticatorProvider {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    hang_challenges: AtomicBool,
    fingerprints: Mutex<VecDeque<Result<String, ThreeDs2Error>>>,
    challenges: Mutex<VecDeque<Result<String, ThreeDs2Error>>>,
}

impl MockAuthenticatorProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fingerprint(&self, result: Result<&str, ThreeDs2Error>) {
        self.fingerprints
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn challenge(&self, result: Result<&str, ThreeDs2Error>) {
        self.challenges
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    /// Challenges never complete, as if the shopper walked away.
    pub fn hang_challenges(&self) {
        self.hang_challenges.store(true, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct MockAuthenticator {
    provider: Arc<MockAuthenticatorProvider>,
    released: bool,
}

#[async_trait::async_trait]
impl ThreeDs2Authenticator for MockAuthenticator {
    async fn create_fingerprint(&mut self, token: &str) -> CustomResult<String, ThreeDs2Error> {
        assert!(!self.released, "fingerprint requested on a released authenticator");
        let next = self.provider.fingerprints.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(format!("fingerprint-of-{token}")))
            .map_err(|error| report!(error))
    }

    async fn present_challenge(
        &mut self,
        token: &str,
    ) -> CustomResult<ChallengeResult, ThreeDs2Error> {
        assert!(!self.released, "challenge presented on a released authenticator");
        if self.provider.hang_challenges.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let next = self.provider.challenges.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(format!("challenge-result-of-{token}")))
            .map(|payload| ChallengeResult { payload })
            .map_err(|error| report!(error))
    }

    fn release(&mut self) {
        assert!(!self.released, "authenticator released twice");
        self.released = true;
        self.provider.released.fetch_add(1, Ordering::SeqCst);
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

pub struct SharedProvider(pub Arc<MockAuthenticatorProvider>);

impl AuthenticatorProvider for SharedProvider {
    fn acquire(&self) -> CustomResult<Box<dyn ThreeDs2Authenticator>, ThreeDs2Error> {
        self.0.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAuthenticator {
            provider: Arc::clone(&self.0),
            released: false,
        }))
    }
}

pub fn reference() -> PaymentReference {
    PaymentReference::new(Configuration::default(), Some("session-blob".to_string()))
}

pub fn handler(
    connector: &Arc<MockConnector>,
    provider: &Arc<MockAuthenticatorProvider>,
) -> PaymentHandler {
    PaymentHandler::builder(Arc::clone(connector) as Arc<dyn PaymentConnector>)
        .reference(reference())
        .authenticator_provider(Arc::new(SharedProvider(Arc::clone(provider))))
        .build()
        .unwrap()
}

pub fn fingerprint_action(token: &str) -> Value {
    json!({
        "resultCode": "IdentifyShopper",
        "action": {
            "type": "threeDS2Fingerprint",
            "paymentData": "pd-fingerprint",
            "paymentMethodType": "scheme",
            "token": token
        }
    })
}

pub fn challenge_action(token: &str) -> Value {
    json!({
        "resultCode": "ChallengeShopper",
        "action": {
            "type": "threeDS2Challenge",
            "paymentData": "pd-challenge",
            "paymentMethodType": "scheme",
            "token": token
        }
    })
}

pub fn authorised() -> Value {
    json!({"resultCode": "Authorised", "pspReference": "881566"})
}

pub fn card() -> Value {
    json!({"type": "scheme", "encryptedCardNumber": "test_4111111111111111"})
}
