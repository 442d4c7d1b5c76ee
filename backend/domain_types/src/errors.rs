use common_enums::AuthenticationResultCode;
use common_utils::consts;

/// Classification errors raised while mapping server payloads onto the model.
///
/// These are never recoverable where they are raised, they travel up to the nearest error sink.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ModelError {
    #[error("Action type not found")]
    ActionTypeNotFound,
    #[error("Action type not found - {0}")]
    UnknownActionType(String),
    #[error("Failed to parse {0}")]
    ParsingFailed(&'static str),
    #[error("Failed to encode {0}")]
    EncodingFailed(&'static str),
    #[error("Expected {expected} authentication but received result code {actual}")]
    AuthenticationMismatch {
        expected: AuthenticationResultCode,
        actual: AuthenticationResultCode,
    },
    #[error("Missing {0} in authentication action")]
    MissingAuthenticationToken(&'static str),
    #[error("Payments response carried neither an action nor a final result code")]
    UnexpectedPaymentsResponse,
}

/// Failures reported by the host supplied transport.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ApiClientError {
    #[error("Request body serialization failed")]
    BodySerializationFailed,
    #[error("Failed to send request to {0}")]
    RequestNotSent(String),
    #[error("Failed to decode response")]
    ResponseDecodingFailed,
    #[error("Server responded with Request Timeout")]
    RequestTimeoutReceived,
    #[error("Server responded with Internal Server Error")]
    InternalServerErrorReceived,
    #[error("Server responded with unexpected response")]
    UnexpectedServerResponse,
}

/// Exception handed to the host.
///
/// A fatal exception ends the payment attempt and is delivered once through the terminal
/// channel; a non-fatal one is only reported for display while the flow stays alive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("{message}")]
pub struct CheckoutException {
    message: String,
    cause: Option<String>,
    fatal: bool,
}

impl CheckoutException {
    pub fn builder(message: impl Into<String>, cause: Option<String>) -> CheckoutExceptionBuilder {
        CheckoutExceptionBuilder {
            message: message.into(),
            cause,
            fatal: false,
        }
    }

    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self::builder(message, None).build()
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::builder(message, None).fatal(true).build()
    }

    /// Wrap a report, keeping its current context as the message and the full chain as cause.
    pub fn from_report<C>(report: &error_stack::Report<C>, fatal: bool) -> Self
    where
        C: error_stack::Context,
    {
        Self::builder(
            report.current_context().to_string(),
            Some(format!("{report:#}")),
        )
        .fatal(fatal)
        .build()
    }

    pub fn payment_reference_not_found() -> Self {
        Self::fatal(consts::PAYMENT_REFERENCE_NOT_FOUND)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

pub struct CheckoutExceptionBuilder {
    message: String,
    cause: Option<String>,
    fatal: bool,
}

impl CheckoutExceptionBuilder {
    pub fn fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }

    pub fn build(self) -> CheckoutException {
        CheckoutException {
            message: self.message,
            cause: self.cause,
            fatal: self.fatal,
        }
    }
}
