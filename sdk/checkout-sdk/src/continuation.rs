//! 3DS2 authentication continuation.
//!
//! Turns an [`AuthenticationDetails`] envelope into the details that have to be submitted back
//! to the payment session, driving the native authenticator in between. Submission itself is
//! left to the caller, which reports the outcome back through [`AuthenticationContinuation::on_next_step`]
//! or [`AuthenticationContinuation::on_submission_failed`].
//!
//! Authenticator lifecycle:
//! * a fingerprint failure releases the authenticator, a fingerprint success keeps it for the
//!   challenge that may follow;
//! * a challenge releases the authenticator whatever its outcome;
//! * a new fingerprint request or any follow-up action other than a challenge supersedes
//!   whatever instance is still held;
//! * finishing the attempt releases any instance still held.

use std::sync::Arc;

use common_enums::AuthenticationResultCode;
use common_utils::CustomResult;
use domain_types::{
    action::Action,
    authentication::{
        AdditionalDetails, AuthenticationDetails, ChallengeAuthentication, ChallengeDetails,
        FingerprintAuthentication, FingerprintDetails,
    },
    payment::NextStep,
};
use error_stack::{report, Report, ResultExt};

use crate::{
    authenticator::{AuthenticatorProvider, AuthenticatorSlot},
    error::{ContinuationError, ThreeDs2Error},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ContinuationState {
    #[default]
    Idle,
    AwaitingFingerprint,
    SubmittingFingerprint,
    AwaitingChallenge,
    PresentingChallenge,
    SubmittingChallenge,
    Error,
    Terminal,
}

#[derive(Debug)]
pub struct AuthenticationContinuation {
    slot: AuthenticatorSlot,
    state: ContinuationState,
}

impl AuthenticationContinuation {
    pub fn new(provider: Option<Arc<dyn AuthenticatorProvider>>) -> Self {
        Self {
            slot: AuthenticatorSlot::new(provider),
            state: ContinuationState::Idle,
        }
    }

    pub fn state(&self) -> ContinuationState {
        self.state
    }

    pub fn holds_authenticator(&self) -> bool {
        self.slot.is_held()
    }

    /// Dispatch on the envelope's result code and produce the details to submit.
    ///
    /// Every failure, including a malformed envelope, is returned here so the caller has a
    /// single place to classify it.
    pub async fn handle(
        &mut self,
        details: &AuthenticationDetails,
    ) -> CustomResult<AdditionalDetails, ContinuationError> {
        tracing::info!(
            result_code = %details.result_code,
            state = %self.state,
            "handling authentication details"
        );

        let result = match &details.result_code {
            AuthenticationResultCode::IdentifyShopper => self.identify_shopper(details).await,
            AuthenticationResultCode::ChallengeShopper => self.challenge_shopper(details).await,
            AuthenticationResultCode::Unsupported(code) => Err(report!(
                ContinuationError::UnsupportedResultCode(code.clone())
            )),
        };

        if result.is_err() {
            self.state = ContinuationState::Error;
        }
        result
    }

    async fn identify_shopper(
        &mut self,
        details: &AuthenticationDetails,
    ) -> CustomResult<AdditionalDetails, ContinuationError> {
        let authentication = details
            .get_authentication::<FingerprintAuthentication>()
            .change_context(ContinuationError::InvalidAuthenticationDetails)?;

        if self.slot.release() {
            tracing::debug!(state = %self.state, "previous authentication superseded");
        }
        self.state = ContinuationState::AwaitingFingerprint;

        let mut lease = self
            .slot
            .lease()
            .map_err(|report| acquisition_error(report, ContinuationError::FingerprintFailed))?;
        let fingerprint = lease
            .create_fingerprint(&authentication.fingerprint_token)
            .await
            .change_context(ContinuationError::FingerprintFailed)?;
        lease.keep();

        self.state = ContinuationState::SubmittingFingerprint;
        Ok(FingerprintDetails { fingerprint }.into())
    }

    async fn challenge_shopper(
        &mut self,
        details: &AuthenticationDetails,
    ) -> CustomResult<AdditionalDetails, ContinuationError> {
        let authentication = details
            .get_authentication::<ChallengeAuthentication>()
            .change_context(ContinuationError::InvalidAuthenticationDetails)?;

        self.state = ContinuationState::PresentingChallenge;

        let mut lease = self
            .slot
            .lease()
            .map_err(|report| acquisition_error(report, ContinuationError::ChallengeFailed))?;
        let result = lease
            .present_challenge(&authentication.challenge_token)
            .await;
        drop(lease);

        let result = result.change_context(ContinuationError::ChallengeFailed)?;
        self.state = ContinuationState::SubmittingChallenge;
        Ok(ChallengeDetails {
            payload: result.payload,
        }
        .into())
    }

    /// Advance after the submitted details were answered by the session.
    pub fn on_next_step(&mut self, next_step: &NextStep) {
        self.state = match next_step {
            NextStep::Finished(_) => {
                self.slot.release();
                ContinuationState::Terminal
            }
            NextStep::Action(Action::Threeds2Challenge(_)) => ContinuationState::AwaitingChallenge,
            NextStep::Action(action) => {
                if self.slot.release() {
                    tracing::debug!(
                        action_type = %action.action_type(),
                        "authentication superseded by another action"
                    );
                }
                ContinuationState::Idle
            }
        };
        tracing::debug!(state = %self.state, "authentication continuation advanced");
    }

    pub fn on_submission_failed(&mut self) {
        self.state = ContinuationState::Error;
    }

    /// Abandon any in-flight authentication and release the authenticator.
    pub fn cancel(&mut self) {
        self.slot.release();
        if self.state != ContinuationState::Terminal {
            self.state = ContinuationState::Idle;
        }
    }

    pub fn finish(&mut self) {
        self.slot.release();
        self.state = ContinuationState::Terminal;
    }
}

fn acquisition_error(
    report: Report<ThreeDs2Error>,
    operation_failed: ContinuationError,
) -> Report<ContinuationError> {
    let context = match report.current_context() {
        ThreeDs2Error::AuthenticatorUnavailable => ContinuationError::AuthenticatorUnavailable,
        _ => operation_failed,
    };
    report.change_context(context)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use domain_types::{action::Threeds2ChallengeAction, payment::PaymentResult};

    use super::*;
    use crate::authenticator::{ChallengeResult, ThreeDs2Authenticator};

    #[derive(Default)]
    struct Script {
        acquired: AtomicUsize,
        released: AtomicUsize,
        fingerprints: Mutex<VecDeque<Result<String, ThreeDs2Error>>>,
        challenges: Mutex<VecDeque<Result<String, ThreeDs2Error>>>,
    }

    struct ScriptedAuthenticator {
        script: Arc<Script>,
        released: bool,
    }

    #[async_trait::async_trait]
    impl ThreeDs2Authenticator for ScriptedAuthenticator {
        async fn create_fingerprint(&mut self, _token: &str) -> CustomResult<String, ThreeDs2Error> {
            let next = self.script.fingerprints.lock().unwrap().pop_front();
            next.unwrap_or(Ok("fingerprint".to_string()))
                .map_err(|error| report!(error))
        }

        async fn present_challenge(
            &mut self,
            _token: &str,
        ) -> CustomResult<ChallengeResult, ThreeDs2Error> {
            let next = self.script.challenges.lock().unwrap().pop_front();
            next.unwrap_or(Ok("challenge".to_string()))
                .map(|payload| ChallengeResult { payload })
                .map_err(|error| report!(error))
        }

        fn release(&mut self) {
            self.released = true;
            self.script.released.fetch_add(1, Ordering::SeqCst);
        }

        fn is_released(&self) -> bool {
            self.released
        }
    }

    impl AuthenticatorProvider for Arc<Script> {
        fn acquire(&self) -> CustomResult<Box<dyn ThreeDs2Authenticator>, ThreeDs2Error> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedAuthenticator {
                script: Arc::clone(self),
                released: false,
            }))
        }
    }

    fn continuation() -> (AuthenticationContinuation, Arc<Script>) {
        let script = Arc::new(Script::default());
        let provider: Arc<dyn AuthenticatorProvider> = Arc::new(Arc::clone(&script));
        (AuthenticationContinuation::new(Some(provider)), script)
    }

    fn released(script: &Script) -> usize {
        script.released.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn fingerprint_success_keeps_authenticator() {
        let (mut continuation, script) = continuation();

        let details = continuation
            .handle(&AuthenticationDetails::identify_shopper("tok"))
            .await
            .unwrap();

        assert_eq!(
            details,
            AdditionalDetails::Fingerprint(FingerprintDetails {
                fingerprint: "fingerprint".to_string()
            })
        );
        assert_eq!(continuation.state(), ContinuationState::SubmittingFingerprint);
        assert_eq!(released(&script), 0);
        assert!(continuation.holds_authenticator());
    }

    #[tokio::test]
    async fn fingerprint_failure_releases_once() {
        let (mut continuation, script) = continuation();
        script
            .fingerprints
            .lock()
            .unwrap()
            .push_back(Err(ThreeDs2Error::FingerprintFailed("sdk".to_string())));

        let error = continuation
            .handle(&AuthenticationDetails::identify_shopper("tok"))
            .await
            .unwrap_err();

        assert_eq!(error.current_context(), &ContinuationError::FingerprintFailed);
        assert_eq!(continuation.state(), ContinuationState::Error);
        assert_eq!(released(&script), 1);
    }

    #[tokio::test]
    async fn challenge_releases_on_success_and_failure() {
        let (mut continuation, script) = continuation();
        script
            .challenges
            .lock()
            .unwrap()
            .push_back(Err(ThreeDs2Error::ChallengeTimedOut));

        let challenge = AuthenticationDetails::challenge_shopper("ctok");
        assert!(continuation.handle(&challenge).await.is_err());
        assert_eq!(released(&script), 1);

        let details = continuation.handle(&challenge).await.unwrap();
        assert_eq!(
            details,
            AdditionalDetails::Challenge(ChallengeDetails {
                payload: "challenge".to_string()
            })
        );
        assert_eq!(continuation.state(), ContinuationState::SubmittingChallenge);
        assert_eq!(released(&script), 2);
        assert_eq!(script.acquired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fingerprint_then_challenge_uses_one_instance() {
        let (mut continuation, script) = continuation();

        continuation
            .handle(&AuthenticationDetails::identify_shopper("tok"))
            .await
            .unwrap();
        continuation.on_next_step(&NextStep::Action(Action::Threeds2Challenge(
            Threeds2ChallengeAction {
                payment_data: None,
                payment_method_type: None,
                token: Some("ctok".to_string()),
            },
        )));
        assert_eq!(continuation.state(), ContinuationState::AwaitingChallenge);

        continuation
            .handle(&AuthenticationDetails::challenge_shopper("ctok"))
            .await
            .unwrap();

        assert_eq!(script.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(released(&script), 1);
    }

    #[tokio::test]
    async fn unsupported_code_fails_without_touching_authenticator() {
        let (mut continuation, script) = continuation();
        let details: AuthenticationDetails =
            serde_json::from_value(serde_json::json!({"resultCode": "UNKNOWN_CODE"})).unwrap();

        let error = continuation.handle(&details).await.unwrap_err();

        assert_eq!(
            error.current_context(),
            &ContinuationError::UnsupportedResultCode("UNKNOWN_CODE".to_string())
        );
        assert_eq!(script.acquired.load(Ordering::SeqCst), 0);
        assert_eq!(continuation.state(), ContinuationState::Error);
    }

    #[tokio::test]
    async fn malformed_envelope_is_reported_through_handle() {
        let (mut continuation, script) = continuation();
        let details: AuthenticationDetails =
            serde_json::from_value(serde_json::json!({"resultCode": "IDENTIFY_SHOPPER"})).unwrap();

        let error = continuation.handle(&details).await.unwrap_err();

        assert_eq!(
            error.current_context(),
            &ContinuationError::InvalidAuthenticationDetails
        );
        assert_eq!(script.acquired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_provider_is_fatal() {
        let mut continuation = AuthenticationContinuation::new(None);

        let error = continuation
            .handle(&AuthenticationDetails::identify_shopper("tok"))
            .await
            .unwrap_err();

        assert!(error.current_context().is_fatal());
    }

    #[tokio::test]
    async fn finishing_releases_a_kept_instance() {
        let (mut continuation, script) = continuation();
        continuation
            .handle(&AuthenticationDetails::identify_shopper("tok"))
            .await
            .unwrap();

        continuation.on_next_step(&NextStep::Finished(PaymentResult {
            result_code: common_enums::PaymentResultCode::Authorised,
            psp_reference: None,
            refusal_reason: None,
            merchant_reference: None,
        }));

        assert_eq!(continuation.state(), ContinuationState::Terminal);
        assert_eq!(released(&script), 1);
        continuation.finish();
        assert_eq!(released(&script), 1);
    }

    #[tokio::test]
    async fn redirect_after_fingerprint_releases_held_instance() {
        let (mut continuation, script) = continuation();
        continuation
            .handle(&AuthenticationDetails::identify_shopper("tok"))
            .await
            .unwrap();

        let redirect = Action::from_value(serde_json::json!({
            "type": "redirect",
            "url": "https://issuer.example/3ds"
        }))
        .unwrap();
        continuation.on_next_step(&NextStep::Action(redirect));

        assert_eq!(continuation.state(), ContinuationState::Idle);
        assert!(!continuation.holds_authenticator());
        assert_eq!(released(&script), 1);

        continuation.finish();
        assert_eq!(released(&script), 1);
    }

    #[tokio::test]
    async fn new_fingerprint_request_supersedes_held_instance() {
        let (mut continuation, script) = continuation();
        let fingerprint = AuthenticationDetails::identify_shopper("tok");

        continuation.handle(&fingerprint).await.unwrap();
        continuation.handle(&fingerprint).await.unwrap();

        assert_eq!(script.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(released(&script), 1);
    }
}
