//! 3DS2 authentication envelopes and the details submitted back to the session.

use std::collections::HashMap;

use common_enums::AuthenticationResultCode;
use common_utils::{ext_traits::ValueExt, CustomResult};
use error_stack::ResultExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    action::{Threeds2ChallengeAction, Threeds2FingerprintAction},
    errors::ModelError,
};

/// Payload embedded in an [`AuthenticationDetails`] envelope for one result code.
pub trait Authentication: DeserializeOwned {
    const RESULT_CODE: AuthenticationResultCode;
    const TYPE_NAME: &'static str;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintAuthentication {
    #[serde(alias = "threeds2.fingerprintToken")]
    pub fingerprint_token: String,
}

impl Authentication for FingerprintAuthentication {
    const RESULT_CODE: AuthenticationResultCode = AuthenticationResultCode::IdentifyShopper;
    const TYPE_NAME: &'static str = "FingerprintAuthentication";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeAuthentication {
    #[serde(alias = "threeds2.challengeToken")]
    pub challenge_token: String,
}

impl Authentication for ChallengeAuthentication {
    const RESULT_CODE: AuthenticationResultCode = AuthenticationResultCode::ChallengeShopper;
    const TYPE_NAME: &'static str = "ChallengeAuthentication";
}

/// Envelope asking the client to authenticate the shopper.
///
/// Everything besides `resultCode` and `paymentData` is the embedded authentication payload,
/// whose shape is decided by the result code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationDetails {
    pub result_code: AuthenticationResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(flatten)]
    pub authentication: Map<String, Value>,
}

impl AuthenticationDetails {
    pub fn identify_shopper(fingerprint_token: impl Into<String>) -> Self {
        Self {
            result_code: AuthenticationResultCode::IdentifyShopper,
            payment_data: None,
            authentication: Map::from_iter([(
                "fingerprintToken".to_string(),
                Value::String(fingerprint_token.into()),
            )]),
        }
    }

    pub fn challenge_shopper(challenge_token: impl Into<String>) -> Self {
        Self {
            result_code: AuthenticationResultCode::ChallengeShopper,
            payment_data: None,
            authentication: Map::from_iter([(
                "challengeToken".to_string(),
                Value::String(challenge_token.into()),
            )]),
        }
    }

    pub fn with_payment_data(mut self, payment_data: Option<String>) -> Self {
        self.payment_data = payment_data;
        self
    }

    /// Extract the embedded payload, refusing a payload type that does not match the result code.
    pub fn get_authentication<A: Authentication>(&self) -> CustomResult<A, ModelError> {
        if self.result_code != A::RESULT_CODE {
            return Err(error_stack::report!(ModelError::AuthenticationMismatch {
                expected: A::RESULT_CODE,
                actual: self.result_code.clone(),
            }));
        }

        Value::Object(self.authentication.clone())
            .parse_value::<A>(A::TYPE_NAME)
            .change_context(ModelError::ParsingFailed(A::TYPE_NAME))
    }
}

impl TryFrom<&Threeds2FingerprintAction> for AuthenticationDetails {
    type Error = error_stack::Report<ModelError>;

    fn try_from(action: &Threeds2FingerprintAction) -> Result<Self, Self::Error> {
        let token = action
            .token
            .clone()
            .ok_or(ModelError::MissingAuthenticationToken("fingerprint token"))?;
        Ok(Self::identify_shopper(token).with_payment_data(action.payment_data.clone()))
    }
}

impl TryFrom<&Threeds2ChallengeAction> for AuthenticationDetails {
    type Error = error_stack::Report<ModelError>;

    fn try_from(action: &Threeds2ChallengeAction) -> Result<Self, Self::Error> {
        let token = action
            .token
            .clone()
            .ok_or(ModelError::MissingAuthenticationToken("challenge token"))?;
        Ok(Self::challenge_shopper(token).with_payment_data(action.payment_data.clone()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintDetails {
    #[serde(rename = "threeds2.fingerprint")]
    pub fingerprint: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDetails {
    #[serde(rename = "threeds2.challengeResult")]
    pub payload: String,
}

/// Query parameters the shopper returned with from a redirect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedirectDetails {
    pub payload: HashMap<String, String>,
}

/// Details resubmitted to the session after an action was performed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AdditionalDetails {
    Fingerprint(FingerprintDetails),
    Challenge(ChallengeDetails),
    Redirect(RedirectDetails),
}

impl AdditionalDetails {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fingerprint(_) => "fingerprint",
            Self::Challenge(_) => "challenge",
            Self::Redirect(_) => "redirect",
        }
    }
}

impl From<FingerprintDetails> for AdditionalDetails {
    fn from(details: FingerprintDetails) -> Self {
        Self::Fingerprint(details)
    }
}

impl From<ChallengeDetails> for AdditionalDetails {
    fn from(details: ChallengeDetails) -> Self {
        Self::Challenge(details)
    }
}

impl From<RedirectDetails> for AdditionalDetails {
    fn from(details: RedirectDetails) -> Self {
        Self::Redirect(details)
    }
}

/// Body of a `/payments/details` submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsDetailsRequest {
    pub details: AdditionalDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
}
