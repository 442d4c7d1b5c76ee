//! Payment handler.
//!
//! Owns one payment session, resolves the actions the session answers with, drives 3DS2
//! authentication through the [`AuthenticationContinuation`] and publishes everything the host
//! needs through observables. Every failure ends in the [`ErrorSink`], which decides between a
//! displayable error and the single terminal outcome.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use common_utils::CustomResult;
use domain_types::{
    action::{Action, RedirectAction},
    authentication::{
        AdditionalDetails, AuthenticationDetails, PaymentsDetailsRequest, RedirectDetails,
    },
    errors::{ApiClientError, CheckoutException},
    payment::{
        NetworkingState, NextStep, PaymentOutcome, PaymentReference, PaymentResult,
        PaymentSession, PaymentsRequest, PaymentsResponse,
    },
};
use serde_json::Value;
use tokio::sync::{Mutex, Notify};

use crate::{
    authenticator::AuthenticatorProvider,
    connector::PaymentConnector,
    continuation::{AuthenticationContinuation, ContinuationState},
    delivery::ErrorSink,
    error::ContinuationError,
    logger::instrument,
    observable::{Observable, Subscription},
};

#[derive(Clone)]
pub struct PaymentHandler {
    shared: Arc<Shared>,
}

struct Shared {
    reference: PaymentReference,
    connector: Arc<dyn PaymentConnector>,
    networking: NetworkingTracker,
    sessions: Observable<PaymentSession>,
    redirects: Observable<RedirectAction>,
    actions: Observable<Action>,
    sink: ErrorSink,
    /// Wakes an authenticator operation in flight so it can be abandoned without the lock.
    cancellation: Notify,
    inner: Mutex<Inner>,
}

struct Inner {
    session: PaymentSession,
    continuation: AuthenticationContinuation,
}

enum Submission {
    Payment(PaymentsRequest),
    Details(AdditionalDetails),
}

impl std::fmt::Debug for PaymentHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentHandler")
            .field("reference", &self.shared.reference.id)
            .finish_non_exhaustive()
    }
}

pub struct PaymentHandlerBuilder {
    connector: Arc<dyn PaymentConnector>,
    reference: Option<PaymentReference>,
    snapshot: Option<PaymentSession>,
    authenticator_provider: Option<Arc<dyn AuthenticatorProvider>>,
}

impl PaymentHandlerBuilder {
    pub fn reference(mut self, reference: PaymentReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Continue from a session snapshot taken before the host was recreated.
    pub fn restore(mut self, snapshot: PaymentSession) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn authenticator_provider(mut self, provider: Arc<dyn AuthenticatorProvider>) -> Self {
        self.authenticator_provider = Some(provider);
        self
    }

    /// Fails with a fatal exception when no reference was given or the snapshot belongs to
    /// another reference.
    pub fn build(self) -> Result<PaymentHandler, CheckoutException> {
        let Some(reference) = self.reference else {
            tracing::error!("payment handler created without a payment reference");
            return Err(CheckoutException::payment_reference_not_found());
        };

        let session = match self.snapshot {
            Some(snapshot) if snapshot.reference != reference.id => {
                tracing::error!(
                    reference = %reference.id,
                    snapshot = %snapshot.reference,
                    "session snapshot belongs to another payment reference"
                );
                return Err(CheckoutException::payment_reference_not_found());
            }
            Some(snapshot) => snapshot,
            None => PaymentSession::new(&reference),
        };

        let sink = ErrorSink::new();
        if session.is_finished() {
            tracing::warn!(reference = %reference.id, "restored an already finished session");
        }

        Ok(PaymentHandler {
            shared: Arc::new(Shared {
                connector: self.connector,
                networking: NetworkingTracker::default(),
                sessions: Observable::new(),
                redirects: Observable::new(),
                actions: Observable::new(),
                sink,
                cancellation: Notify::new(),
                inner: Mutex::new(Inner {
                    session,
                    continuation: AuthenticationContinuation::new(self.authenticator_provider),
                }),
                reference,
            }),
        })
    }
}

impl PaymentHandler {
    pub fn builder(connector: Arc<dyn PaymentConnector>) -> PaymentHandlerBuilder {
        PaymentHandlerBuilder {
            connector,
            reference: None,
            snapshot: None,
            authenticator_provider: None,
        }
    }

    pub fn reference(&self) -> &PaymentReference {
        &self.shared.reference
    }

    pub fn networking_state(&self) -> Subscription<NetworkingState> {
        self.shared.networking.state.subscribe()
    }

    pub fn payment_session(&self) -> Subscription<PaymentSession> {
        self.shared.sessions.subscribe()
    }

    pub fn payment_result(&self) -> Subscription<PaymentOutcome> {
        self.shared.sink.terminal().subscribe()
    }

    pub fn errors(&self) -> Subscription<CheckoutException> {
        self.shared.sink.subscribe()
    }

    pub fn redirects(&self) -> Subscription<RedirectAction> {
        self.shared.redirects.subscribe()
    }

    /// Actions the host presents itself, such as QR codes and vouchers.
    pub fn actions(&self) -> Subscription<Action> {
        self.shared.actions.subscribe()
    }

    pub async fn snapshot(&self) -> PaymentSession {
        self.shared.inner.lock().await.session.clone()
    }

    pub async fn authentication_state(&self) -> ContinuationState {
        self.shared.inner.lock().await.continuation.state()
    }

    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn submit_payment(&self, payment_method: Value) {
        let mut inner = self.shared.inner.lock().await;
        if self.is_finished(&inner) {
            return;
        }

        let request = PaymentsRequest::new(&self.shared.reference, payment_method);
        self.run(&mut inner, Submission::Payment(request)).await;
    }

    /// Continue from a `/payments` response body the host obtained on its own.
    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn handle_response(&self, body: Value) {
        let mut inner = self.shared.inner.lock().await;
        if self.is_finished(&inner) {
            return;
        }

        if let Some(submission) = self.process(&mut inner, body).await {
            self.run(&mut inner, submission).await;
        }
    }

    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn handle_action(&self, action: Action) {
        let mut inner = self.shared.inner.lock().await;
        if self.is_finished(&inner) {
            return;
        }

        if let Some(submission) = self.dispatch_action(&mut inner, action).await {
            self.run(&mut inner, submission).await;
        }
    }

    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn handle_authentication_details(&self, details: AuthenticationDetails) {
        let mut inner = self.shared.inner.lock().await;
        if self.is_finished(&inner) {
            return;
        }

        if let Some(submission) = self.authenticate(&mut inner, details).await {
            self.run(&mut inner, submission).await;
        }
    }

    /// Submit the parameters the shopper returned with from a redirect.
    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn submit_redirect_result(&self, details: RedirectDetails) {
        let mut inner = self.shared.inner.lock().await;
        if self.is_finished(&inner) {
            return;
        }

        self.run(&mut inner, Submission::Details(details.into()))
            .await;
    }

    /// Pick the flow up again after a restore or a non-fatal authentication failure.
    ///
    /// A pending authentication is dispatched again with a freshly acquired authenticator;
    /// otherwise the last action is published again for the host to present.
    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn resume(&self) {
        let mut inner = self.shared.inner.lock().await;
        if self.is_finished(&inner) {
            return;
        }

        if let Some(details) = inner.session.pending_authentication.clone() {
            tracing::info!(result_code = %details.result_code, "resuming pending authentication");
            if let Some(submission) = self.authenticate(&mut inner, details).await {
                self.run(&mut inner, submission).await;
            }
        } else if let Some(action) = inner.session.last_action.clone() {
            tracing::info!(action_type = %action.action_type(), "republishing last action");
            self.publish_action(&action);
        }
    }

    /// Abandon the in-flight authentication and release the authenticator.
    ///
    /// A fingerprint or challenge still awaiting the device or the shopper is interrupted first,
    /// which releases its authenticator and lets the call that started it return.
    #[instrument(skip_all, fields(reference = %self.shared.reference.id))]
    pub async fn cancel_authentication(&self) {
        self.shared.cancellation.notify_waiters();
        let mut inner = self.shared.inner.lock().await;
        inner.continuation.cancel();
        if !inner.session.is_finished() {
            inner.session.clear_authentication();
            self.publish_session(&inner);
        }
    }

    fn is_finished(&self, inner: &Inner) -> bool {
        let finished = inner.session.is_finished() || self.shared.sink.terminal().is_finished();
        if finished {
            tracing::warn!("payment attempt already finished, request ignored");
        }
        finished
    }

    async fn run(&self, inner: &mut Inner, submission: Submission) {
        let mut next = Some(submission);
        while let Some(submission) = next.take() {
            match self.execute(inner, &submission).await {
                Ok(body) => next = self.process(inner, body).await,
                Err(report) => {
                    inner.continuation.on_submission_failed();
                    inner.session.suspend_authentication();
                    self.publish_session(inner);
                    self.report(CheckoutException::from_report(&report, false));
                }
            }
        }
    }

    async fn execute(
        &self,
        inner: &mut Inner,
        submission: &Submission,
    ) -> CustomResult<Value, ApiClientError> {
        let _request = self.shared.networking.begin();
        inner.session.submissions = inner.session.submissions.saturating_add(1);

        match submission {
            Submission::Payment(request) => {
                tracing::info!("submitting payment");
                self.shared
                    .connector
                    .payments(&inner.session.configuration, request)
                    .await
            }
            Submission::Details(details) => {
                tracing::info!(details = details.kind(), "submitting payment details");
                let request = PaymentsDetailsRequest {
                    details: details.clone(),
                    payment_data: inner.session.payment_data.clone(),
                };
                self.shared
                    .connector
                    .payments_details(&inner.session.configuration, &request)
                    .await
            }
        }
    }

    async fn process(&self, inner: &mut Inner, body: Value) -> Option<Submission> {
        let next_step =
            match PaymentsResponse::from_value(body).and_then(PaymentsResponse::into_next_step) {
                Ok(next_step) => next_step,
                Err(report) => {
                    self.fail(inner, CheckoutException::from_report(&report, true));
                    return None;
                }
            };

        inner.session.clear_authentication();
        inner.continuation.on_next_step(&next_step);

        match next_step {
            NextStep::Finished(result) => {
                self.complete(inner, result);
                None
            }
            NextStep::Action(action) => self.dispatch_action(inner, action).await,
        }
    }

    async fn dispatch_action(&self, inner: &mut Inner, action: Action) -> Option<Submission> {
        tracing::info!(action_type = %action.action_type(), "handling action");
        inner.session.apply_action(&action);
        self.publish_session(inner);

        let details = match &action {
            Action::Threeds2Fingerprint(fingerprint) => AuthenticationDetails::try_from(fingerprint),
            Action::Threeds2Challenge(challenge) => AuthenticationDetails::try_from(challenge),
            Action::Redirect(_) | Action::QrCode(_) | Action::Voucher(_) => {
                self.publish_action(&action);
                return None;
            }
        };

        match details {
            Ok(details) => self.authenticate(inner, details).await,
            Err(report) => {
                inner.session.clear_authentication();
                self.publish_session(inner);
                self.report(CheckoutException::from_report(&report, false));
                None
            }
        }
    }

    async fn authenticate(
        &self,
        inner: &mut Inner,
        details: AuthenticationDetails,
    ) -> Option<Submission> {
        inner.session.begin_authentication(&details);
        self.publish_session(inner);

        let cancelled = self.shared.cancellation.notified();
        let result = tokio::select! {
            result = inner.continuation.handle(&details) => result,
            () = cancelled => {
                tracing::info!(result_code = %details.result_code, "authentication cancelled");
                inner.continuation.cancel();
                inner.session.clear_authentication();
                self.publish_session(inner);
                return None;
            }
        };

        let report = match result {
            Ok(additional) => return Some(Submission::Details(additional)),
            Err(report) => report,
        };

        let context = report.current_context();
        let exception = CheckoutException::from_report(&report, context.is_fatal());
        if exception.is_fatal() {
            self.fail(inner, exception);
            return None;
        }

        match context {
            ContinuationError::UnsupportedResultCode(_)
            | ContinuationError::InvalidAuthenticationDetails => {
                inner.session.clear_authentication()
            }
            ContinuationError::AuthenticatorUnavailable
            | ContinuationError::FingerprintFailed
            | ContinuationError::ChallengeFailed => inner.session.suspend_authentication(),
        }
        self.publish_session(inner);
        self.report(exception);
        None
    }

    fn publish_action(&self, action: &Action) {
        match action {
            Action::Redirect(redirect) => {
                self.shared.redirects.emit(redirect.clone());
            }
            _ => {
                self.shared.actions.emit(action.clone());
            }
        }
    }

    fn publish_session(&self, inner: &Inner) {
        self.shared.sessions.emit(inner.session.clone());
    }

    fn complete(&self, inner: &mut Inner, result: PaymentResult) {
        tracing::info!(
            result_code = %result.result_code,
            psp_reference = result.psp_reference.as_deref(),
            "payment finished"
        );
        inner.session.finish();
        inner.continuation.finish();
        self.publish_session(inner);

        if let Err(error) = self
            .shared
            .sink
            .terminal()
            .deliver(PaymentOutcome::Completed(result))
        {
            tracing::debug!(?error, "payment result dropped");
        }
    }

    fn fail(&self, inner: &mut Inner, exception: CheckoutException) {
        inner.session.finish();
        inner.continuation.finish();
        self.publish_session(inner);
        self.report(exception);
    }

    fn report(&self, exception: CheckoutException) {
        if let Err(error) = self.shared.sink.report(exception) {
            tracing::debug!(?error, "checkout exception dropped");
        }
    }
}

/// Counts outstanding requests and publishes a [`NetworkingState`] whenever that count moves
/// between zero and non-zero.
#[derive(Debug, Default)]
struct NetworkingTracker {
    executing: AtomicUsize,
    state: Observable<NetworkingState>,
}

impl NetworkingTracker {
    fn begin(&self) -> RequestGuard<'_> {
        if self.executing.fetch_add(1, Ordering::AcqRel) == 0 {
            self.state.emit(NetworkingState {
                executing_requests: true,
            });
        }
        RequestGuard { tracker: self }
    }
}

struct RequestGuard<'a> {
    tracker: &'a NetworkingTracker,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.executing.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.state.emit(NetworkingState {
                executing_requests: false,
            });
        }
    }
}
