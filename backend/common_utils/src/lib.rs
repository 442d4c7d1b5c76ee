//! Utilities shared by the checkout crates

pub mod consts;
pub mod errors;
pub mod ext_traits;
pub mod id_type;
pub mod types;

pub use errors::{CustomResult, ParsingError, ValidationError};
pub use id_type::{generate_id_with_default_len, PaymentReferenceId};
pub use types::Locale;
