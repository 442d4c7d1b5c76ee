//! Consolidated constants for the checkout SDK

// =============================================================================
// ID Generation and Length Constants
// =============================================================================

pub const ID_LENGTH: usize = 20;

/// Characters to use for generating NanoID
pub(crate) const ALPHABETS: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// Prefix of generated payment reference ids
pub const PAYMENT_REFERENCE_PREFIX: &str = "pay";

// =============================================================================
// Wire Field Names
// =============================================================================

/// Discriminator field of an action payload
pub const ACTION_TYPE: &str = "type";
/// Field of a payments response holding the next action
pub const ACTION: &str = "action";

// =============================================================================
// Error Messages
// =============================================================================

/// Raised when a handler is created without a payment reference
pub const PAYMENT_REFERENCE_NOT_FOUND: &str = "Unable to find PaymentReference.";

// =============================================================================
// Environment and Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Development,
    Release,
}

impl Env {
    pub const fn current_env() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Release
        }
    }

    pub const fn config_path(self) -> &'static str {
        match self {
            Self::Development => "development.toml",
            Self::Release => "production.toml",
        }
    }
}

impl std::fmt::Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Release => write!(f, "release"),
        }
    }
}
