use std::{fmt, str::FromStr};

/// Discriminator of an action returned by the `/payments` endpoint.
///
/// The set is closed: every value the server may send in the `type` field of an action must
/// have a variant here, anything else is rejected while resolving the action.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum ActionType {
    #[serde(rename = "redirect")]
    #[strum(serialize = "redirect")]
    Redirect,
    #[serde(rename = "threeDS2Fingerprint")]
    #[strum(serialize = "threeDS2Fingerprint")]
    Threeds2Fingerprint,
    #[serde(rename = "threeDS2Challenge")]
    #[strum(serialize = "threeDS2Challenge")]
    Threeds2Challenge,
    #[serde(rename = "qrCode")]
    #[strum(serialize = "qrCode")]
    QrCode,
    #[serde(rename = "voucher")]
    #[strum(serialize = "voucher")]
    Voucher,
}

impl ActionType {
    /// Actions that are resolved by the 3DS2 authenticator rather than by the host.
    pub fn is_authentication(self) -> bool {
        matches!(self, Self::Threeds2Fingerprint | Self::Threeds2Challenge)
    }
}

/// Result code carried by an authentication envelope.
///
/// Codes the SDK does not know how to handle are kept verbatim in `Unsupported` so that they
/// can be reported back to the host.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize, strum::EnumString)]
#[serde(from = "String", into = "String")]
pub enum AuthenticationResultCode {
    #[strum(to_string = "IDENTIFY_SHOPPER", serialize = "IdentifyShopper")]
    IdentifyShopper,
    #[strum(to_string = "CHALLENGE_SHOPPER", serialize = "ChallengeShopper")]
    ChallengeShopper,
    #[strum(default)]
    Unsupported(String),
}

impl AuthenticationResultCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::IdentifyShopper => "IDENTIFY_SHOPPER",
            Self::ChallengeShopper => "CHALLENGE_SHOPPER",
            Self::Unsupported(code) => code,
        }
    }
}

impl fmt::Display for AuthenticationResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AuthenticationResultCode {
    fn from(value: String) -> Self {
        Self::from_str(&value).unwrap_or(Self::Unsupported(value))
    }
}

impl From<AuthenticationResultCode> for String {
    fn from(value: AuthenticationResultCode) -> Self {
        match value {
            AuthenticationResultCode::Unsupported(code) => code,
            known => known.as_str().to_owned(),
        }
    }
}

/// Outcome of a payment as reported by the `/payments` endpoint.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum PaymentResultCode {
    Authorised,
    Refused,
    Cancelled,
    Error,
    Pending,
    Received,
    /// The payment needs a follow-up action from the shopper.
    RedirectShopper,
    IdentifyShopper,
    ChallengeShopper,
    PresentToShopper,
    PartiallyAuthorised,
    /// Authentication-only flows end with one of these instead of an authorisation.
    AuthenticationFinished,
    AuthenticationNotRequired,
    /// Any code this client does not know yet. Ends the attempt without claiming success.
    #[serde(other)]
    Unknown,
}

impl PaymentResultCode {
    /// Whether this code ends the payment attempt on its own, without an accompanying action.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::RedirectShopper
                | Self::IdentifyShopper
                | Self::ChallengeShopper
                | Self::PresentToShopper
        )
    }

    pub fn is_success(self) -> bool {
        matches!(
            self,
            Self::Authorised
                | Self::Pending
                | Self::Received
                | Self::AuthenticationFinished
                | Self::AuthenticationNotRequired
        )
    }
}

/// Processor environment the payment session talks to.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Environment {
    #[default]
    Test,
    Europe,
    UnitedStates,
    Australia,
}

impl Environment {
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Test => "https://checkout-test.adyen.com/",
            Self::Europe => "https://checkout-live.adyen.com/",
            Self::UnitedStates => "https://checkout-live-us.adyen.com/",
            Self::Australia => "https://checkout-live-au.adyen.com/",
        }
    }

    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Test)
    }
}

/// HTTP method a redirect must be performed with.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RedirectMethod {
    #[default]
    Get,
    Post,
}
