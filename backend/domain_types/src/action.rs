//! Actions returned by the `/payments` endpoint.
//!
//! An action tells the client what needs to be done to continue a payment. Each kind of action
//! carries different properties, so the wire payload is resolved on its `type` discriminator
//! into one variant of the closed [`Action`] sum type and the variant parses its own fields.

use std::{collections::HashMap, str::FromStr};

use common_enums::{ActionType, RedirectMethod};
use common_utils::{
    consts,
    ext_traits::{Encode, StringExt, ValueExt},
    CustomResult,
};
use error_stack::ResultExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;

/// A concrete action model bound to its discriminator.
pub trait ActionModel: Serialize + DeserializeOwned + std::fmt::Debug {
    const ACTION_TYPE: ActionType;
    const TYPE_NAME: &'static str;

    fn payment_data(&self) -> Option<&str>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<RedirectMethod>,
    /// Form fields to post when `method` is `POST`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threeds2FingerprintAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    /// Encoded fingerprint token handed to the 3DS2 authenticator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threeds2ChallengeAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    /// Encoded challenge token handed to the 3DS2 authenticator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub currency: String,
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Amount>,
}

macro_rules! impl_action_model {
    ($model:ty, $action_type:expr) => {
        impl ActionModel for $model {
            const ACTION_TYPE: ActionType = $action_type;
            const TYPE_NAME: &'static str = stringify!($model);

            fn payment_data(&self) -> Option<&str> {
                self.payment_data.as_deref()
            }
        }
    };
}

impl_action_model!(RedirectAction, ActionType::Redirect);
impl_action_model!(Threeds2FingerprintAction, ActionType::Threeds2Fingerprint);
impl_action_model!(Threeds2ChallengeAction, ActionType::Threeds2Challenge);
impl_action_model!(QrCodeAction, ActionType::QrCode);
impl_action_model!(VoucherAction, ActionType::Voucher);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Redirect(RedirectAction),
    Threeds2Fingerprint(Threeds2FingerprintAction),
    Threeds2Challenge(Threeds2ChallengeAction),
    QrCode(QrCodeAction),
    Voucher(VoucherAction),
}

impl Action {
    /// Select the action variant for a discriminator.
    pub fn resolve(action_type: &str) -> CustomResult<ActionType, ModelError> {
        if !action_type.has_content() {
            return Err(error_stack::report!(ModelError::ActionTypeNotFound));
        }
        ActionType::from_str(action_type).map_err(|_| {
            error_stack::report!(ModelError::UnknownActionType(action_type.to_owned()))
        })
    }

    pub fn from_value(value: Value) -> CustomResult<Self, ModelError> {
        let action_type = value
            .get(consts::ACTION_TYPE)
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(match Self::resolve(action_type)? {
            ActionType::Redirect => Self::Redirect(decode(value)?),
            ActionType::Threeds2Fingerprint => Self::Threeds2Fingerprint(decode(value)?),
            ActionType::Threeds2Challenge => Self::Threeds2Challenge(decode(value)?),
            ActionType::QrCode => Self::QrCode(decode(value)?),
            ActionType::Voucher => Self::Voucher(decode(value)?),
        })
    }

    pub fn to_value(&self) -> CustomResult<Value, ModelError> {
        match self {
            Self::Redirect(action) => encode(action),
            Self::Threeds2Fingerprint(action) => encode(action),
            Self::Threeds2Challenge(action) => encode(action),
            Self::QrCode(action) => encode(action),
            Self::Voucher(action) => encode(action),
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Redirect(_) => RedirectAction::ACTION_TYPE,
            Self::Threeds2Fingerprint(_) => Threeds2FingerprintAction::ACTION_TYPE,
            Self::Threeds2Challenge(_) => Threeds2ChallengeAction::ACTION_TYPE,
            Self::QrCode(_) => QrCodeAction::ACTION_TYPE,
            Self::Voucher(_) => VoucherAction::ACTION_TYPE,
        }
    }

    pub fn payment_data(&self) -> Option<&str> {
        match self {
            Self::Redirect(action) => action.payment_data(),
            Self::Threeds2Fingerprint(action) => action.payment_data(),
            Self::Threeds2Challenge(action) => action.payment_data(),
            Self::QrCode(action) => action.payment_data(),
            Self::Voucher(action) => action.payment_data(),
        }
    }
}

fn decode<A: ActionModel>(value: Value) -> CustomResult<A, ModelError> {
    value
        .parse_value::<A>(A::TYPE_NAME)
        .change_context(ModelError::ParsingFailed(A::TYPE_NAME))
}

fn encode<A: ActionModel>(action: &A) -> CustomResult<Value, ModelError> {
    let mut object = action
        .encode_to_object(A::TYPE_NAME)
        .change_context(ModelError::EncodingFailed(A::TYPE_NAME))?;
    object.insert(
        consts::ACTION_TYPE.to_owned(),
        Value::String(A::ACTION_TYPE.to_string()),
    );
    Ok(Value::Object(object))
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_value()
            .map_err(|report| serde::ser::Error::custom(report.current_context()))?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(|report| serde::de::Error::custom(report.current_context()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_actions() -> Vec<Action> {
        vec![
            Action::Redirect(RedirectAction {
                payment_data: Some("pd-redirect".to_string()),
                payment_method_type: Some("ideal".to_string()),
                url: Some("https://issuer.example/redirect?id=1".to_string()),
                method: Some(RedirectMethod::Post),
                data: Some(HashMap::from([("MD".to_string(), "md-value".to_string())])),
            }),
            Action::Threeds2Fingerprint(Threeds2FingerprintAction {
                payment_data: Some("pd-fp".to_string()),
                payment_method_type: Some("scheme".to_string()),
                token: Some("fingerprint-token".to_string()),
            }),
            Action::Threeds2Challenge(Threeds2ChallengeAction {
                payment_data: None,
                payment_method_type: Some("scheme".to_string()),
                token: Some("challenge-token".to_string()),
            }),
            Action::QrCode(QrCodeAction {
                payment_data: Some("pd-qr".to_string()),
                payment_method_type: Some("pix".to_string()),
                qr_code_data: Some("00020126580014br.gov.bcb.pix".to_string()),
                url: None,
            }),
            Action::Voucher(VoucherAction {
                payment_data: None,
                payment_method_type: Some("boletobancario".to_string()),
                reference: Some("12101.1234 5678".to_string()),
                download_url: Some("https://vouchers.example/download".to_string()),
                instructions_url: None,
                expires_at: Some("2026-11-01T00:00:00".to_string()),
                merchant_name: Some("Test Merchant".to_string()),
                total_amount: Some(Amount {
                    currency: "BRL".to_string(),
                    value: 1000,
                }),
            }),
        ]
    }

    #[test]
    fn every_variant_survives_write_then_read() {
        for action in sample_actions() {
            let payload = action.to_value().unwrap();
            assert_eq!(
                payload.get("type").and_then(Value::as_str),
                Some(action.action_type().to_string().as_str())
            );
            assert_eq!(Action::from_value(payload).unwrap(), action);
        }
    }

    #[test]
    fn redirect_payload_resolves_to_redirect_variant() {
        let action = Action::from_value(json!({"type": "redirect", "paymentData": "abc"})).unwrap();
        assert_eq!(action.action_type(), ActionType::Redirect);
        assert_eq!(action.payment_data(), Some("abc"));
        assert!(matches!(action, Action::Redirect(RedirectAction { url: None, .. })));
    }

    #[test]
    fn missing_or_empty_type_is_rejected() {
        for payload in [
            json!({"paymentData": "abc"}),
            json!({"type": "", "paymentData": "abc"}),
            json!({"type": 7}),
        ] {
            let error = Action::from_value(payload).unwrap_err();
            assert_eq!(error.current_context(), &ModelError::ActionTypeNotFound);
            assert_eq!(error.current_context().to_string(), "Action type not found");
        }
    }

    #[test]
    fn unknown_type_is_named_in_error() {
        let error = Action::from_value(json!({"type": "sdk", "paymentData": "abc"})).unwrap_err();
        assert_eq!(
            error.current_context(),
            &ModelError::UnknownActionType("sdk".to_string())
        );
        assert_eq!(
            error.current_context().to_string(),
            "Action type not found - sdk"
        );
    }

    #[test]
    fn variant_fields_are_parsed_by_the_variant() {
        let error = Action::from_value(json!({"type": "threeDS2Fingerprint", "token": 42}))
            .unwrap_err();
        assert_eq!(
            error.current_context(),
            &ModelError::ParsingFailed("Threeds2FingerprintAction")
        );
    }

    #[test]
    fn action_embeds_through_serde() {
        #[derive(Debug, Deserialize, Serialize)]
        struct Envelope {
            action: Action,
        }

        let envelope: Envelope = serde_json::from_value(json!({
            "action": {"type": "qrCode", "qrCodeData": "data", "paymentData": "pd"}
        }))
        .unwrap();
        assert_eq!(envelope.action.action_type(), ActionType::QrCode);

        let rejected = serde_json::from_value::<Envelope>(json!({"action": {"type": "await"}}));
        assert!(rejected
            .unwrap_err()
            .to_string()
            .contains("Action type not found - await"));

        let written = serde_json::to_value(&envelope).unwrap();
        assert_eq!(written["action"]["type"], json!("qrCode"));
    }
}
