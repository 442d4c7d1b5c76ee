#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed while loading configuration: {0}")]
    ConfigError(#[from] config::ConfigError),
    #[error("Invalid checkout configuration: {0}")]
    InvalidCheckout(String),
}

/// Failures reported by the 3DS2 authenticator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreeDs2Error {
    #[error("3DS2 authenticator is not available in this integration")]
    AuthenticatorUnavailable,
    #[error("3DS2 authenticator could not be created: {0}")]
    InitializationFailed(String),
    #[error("3DS2 authenticator was used after being released")]
    AuthenticatorReleased,
    #[error("Fingerprint could not be created: {0}")]
    FingerprintFailed(String),
    #[error("Challenge could not be completed: {0}")]
    ChallengeFailed(String),
    #[error("Challenge was cancelled by the shopper")]
    ChallengeCancelled,
    #[error("Challenge timed out")]
    ChallengeTimedOut,
}

/// Errors raised while driving an authentication envelope to completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContinuationError {
    #[error("Unsupported result code: {0}")]
    UnsupportedResultCode(String),
    #[error("Invalid authentication details")]
    InvalidAuthenticationDetails,
    #[error("3DS2 authentication is not supported by this integration")]
    AuthenticatorUnavailable,
    #[error("3DS2 fingerprint could not be created")]
    FingerprintFailed,
    #[error("3DS2 challenge could not be completed")]
    ChallengeFailed,
}

impl ContinuationError {
    /// Only a missing authenticator makes the payment impossible to continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticatorUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Payment attempt already finished, terminal outcome not delivered again")]
    AlreadyFinished,
}
