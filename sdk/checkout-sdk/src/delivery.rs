//! Terminal outcome delivery and error classification.

use std::sync::atomic::{AtomicBool, Ordering};

use common_utils::CustomResult;
use domain_types::{errors::CheckoutException, payment::PaymentOutcome};
use error_stack::report;

use crate::{
    error::DeliveryError,
    observable::{Observable, Subscription},
};

/// Channel carrying the single terminal outcome of a payment attempt.
#[derive(Debug, Default)]
pub struct TerminalChannel {
    delivered: AtomicBool,
    outcome: Observable<PaymentOutcome>,
}

impl TerminalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<PaymentOutcome> {
        self.outcome.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }

    /// Deliver `outcome` unless an outcome was already delivered.
    pub fn deliver(&self, outcome: PaymentOutcome) -> CustomResult<(), DeliveryError> {
        if self.delivered.swap(true, Ordering::AcqRel) {
            tracing::error!(?outcome, "terminal outcome rejected, payment already finished");
            return Err(report!(DeliveryError::AlreadyFinished));
        }

        let receivers = self.outcome.emit(outcome);
        tracing::info!(receivers, "terminal outcome delivered");
        Ok(())
    }
}

/// Where every [`CheckoutException`] raised during a payment ends up.
///
/// Fatal exceptions finish the attempt through the [`TerminalChannel`]; non-fatal ones are
/// published for display and the flow stays alive.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Observable<CheckoutException>,
    terminal: TerminalChannel,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminal(&self) -> &TerminalChannel {
        &self.terminal
    }

    pub fn subscribe(&self) -> Subscription<CheckoutException> {
        self.errors.subscribe()
    }

    pub fn report(&self, exception: CheckoutException) -> CustomResult<(), DeliveryError> {
        if exception.is_fatal() {
            tracing::error!(
                message = exception.message(),
                cause = exception.cause(),
                "fatal checkout error"
            );
            self.terminal.deliver(PaymentOutcome::Failed(exception))
        } else {
            tracing::warn!(
                message = exception.message(),
                cause = exception.cause(),
                "checkout error"
            );
            self.errors.emit(exception);
            Ok(())
        }
    }
}
