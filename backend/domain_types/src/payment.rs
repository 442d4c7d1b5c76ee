use common_enums::PaymentResultCode;
use common_utils::{consts, ext_traits::ValueExt, CustomResult, Locale, PaymentReferenceId};
use error_stack::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    action::Action, authentication::AuthenticationDetails, configuration::Configuration,
    errors::{CheckoutException, ModelError},
};

/// Handle the host keeps to a payment session; enough to rebuild the session after the host
/// process was recreated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReference {
    pub id: PaymentReferenceId,
    pub configuration: Configuration,
    /// Opaque session blob returned by the merchant server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_session: Option<String>,
}

impl PaymentReference {
    pub fn new(configuration: Configuration, payment_session: Option<String>) -> Self {
        Self {
            id: PaymentReferenceId::generate(),
            configuration,
            payment_session,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Created,
    /// Waiting for the host or the shopper to act on the last action.
    AwaitingShopper,
    /// A 3DS2 fingerprint or challenge is in flight.
    Authenticating,
    Finished,
}

/// Snapshot of the in-progress payment.
///
/// Owned and mutated only by the payment handler; everyone else observes copies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub reference: PaymentReferenceId,
    pub configuration: Configuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<Action>,
    /// Authentication request in flight, kept so the flow can be resumed after recreation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_authentication: Option<AuthenticationDetails>,
    #[serde(default)]
    pub submissions: u32,
}

impl PaymentSession {
    pub fn new(reference: &PaymentReference) -> Self {
        Self {
            reference: reference.id.clone(),
            configuration: reference.configuration.clone(),
            payment_data: None,
            status: SessionStatus::Created,
            last_action: None,
            pending_authentication: None,
            submissions: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    /// Record a new action; its `paymentData`, when present, replaces the stored one.
    pub fn apply_action(&mut self, action: &Action) {
        if let Some(payment_data) = action.payment_data() {
            self.payment_data = Some(payment_data.to_owned());
        }
        self.status = if action.action_type().is_authentication() {
            SessionStatus::Authenticating
        } else {
            SessionStatus::AwaitingShopper
        };
        self.last_action = Some(action.clone());
    }

    pub fn begin_authentication(&mut self, details: &AuthenticationDetails) {
        if let Some(payment_data) = &details.payment_data {
            self.payment_data = Some(payment_data.clone());
        }
        self.status = SessionStatus::Authenticating;
        self.pending_authentication = Some(details.clone());
    }

    /// Keep the pending authentication so the host can retry it, but hand control back.
    pub fn suspend_authentication(&mut self) {
        if self.status == SessionStatus::Authenticating {
            self.status = SessionStatus::AwaitingShopper;
        }
    }

    pub fn clear_authentication(&mut self) {
        self.pending_authentication = None;
        if self.status == SessionStatus::Authenticating {
            self.status = SessionStatus::AwaitingShopper;
        }
    }

    pub fn finish(&mut self) {
        self.status = SessionStatus::Finished;
        self.pending_authentication = None;
    }
}

/// Final result of a payment attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub result_code: PaymentResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psp_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
}

impl PaymentResult {
    pub fn is_success(&self) -> bool {
        self.result_code.is_success()
    }
}

/// Body of a `/payments` submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsRequest {
    pub reference: PaymentReferenceId,
    pub payment_method: Value,
    pub shopper_locale: Locale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_session: Option<String>,
}

impl PaymentsRequest {
    pub fn new(reference: &PaymentReference, payment_method: Value) -> Self {
        Self {
            reference: reference.id.clone(),
            payment_method,
            shopper_locale: reference.configuration.shopper_locale.clone(),
            payment_session: reference.payment_session.clone(),
        }
    }
}

/// Response of the `/payments` and `/payments/details` endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_code: Option<PaymentResultCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psp_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NextStep {
    Action(Action),
    Finished(PaymentResult),
}

impl PaymentsResponse {
    /// Decode a raw response body, keeping action resolution errors intact.
    pub fn from_value(value: Value) -> CustomResult<Self, ModelError> {
        let Value::Object(mut object) = value else {
            return Err(
                error_stack::report!(ModelError::ParsingFailed("PaymentsResponse"))
                    .attach_printable("response body is not a JSON object"),
            );
        };

        let action = object
            .remove(consts::ACTION)
            .filter(|action| !action.is_null())
            .map(Action::from_value)
            .transpose()?;

        let mut response = Value::Object(object)
            .parse_value::<Self>("PaymentsResponse")
            .change_context(ModelError::ParsingFailed("PaymentsResponse"))?;
        response.action = action;
        Ok(response)
    }

    /// An action wins over the result code; without one, only a terminal code ends the attempt.
    pub fn into_next_step(self) -> CustomResult<NextStep, ModelError> {
        if let Some(action) = self.action {
            return Ok(NextStep::Action(action));
        }

        match self.result_code {
            Some(result_code) if result_code.is_terminal() => {
                Ok(NextStep::Finished(PaymentResult {
                    result_code,
                    psp_reference: self.psp_reference,
                    refusal_reason: self.refusal_reason,
                    merchant_reference: self.merchant_reference,
                }))
            }
            Some(result_code) => Err(error_stack::report!(
                ModelError::UnexpectedPaymentsResponse
            )
            .attach_printable(format!("non-terminal result code {result_code} without action"))),
            None => Err(error_stack::report!(ModelError::UnexpectedPaymentsResponse)),
        }
    }
}

/// Whether requests to the processor are outstanding. Purely a progress indication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkingState {
    pub executing_requests: bool,
}

/// The single terminal value delivered to the host for a payment attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Completed(PaymentResult),
    Failed(CheckoutException),
}
