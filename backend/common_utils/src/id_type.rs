//! Common ID types

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    consts::{ALPHABETS, ID_LENGTH, PAYMENT_REFERENCE_PREFIX},
    CustomResult, ValidationError,
};

#[inline]
pub fn generate_id_with_default_len(prefix: &str) -> String {
    format!("{}_{}", prefix, nanoid::nanoid!(ID_LENGTH, &ALPHABETS))
}

/// Identifier of a payment reference handed to the host when a payment session is created.
#[derive(Clone, Hash, PartialEq, Eq, Serialize)]
pub struct PaymentReferenceId(String);

impl PaymentReferenceId {
    /// Generate a new reference id with the `pay_` prefix
    pub fn generate() -> Self {
        Self(generate_id_with_default_len(PAYMENT_REFERENCE_PREFIX))
    }

    pub fn get_string_repr(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PaymentReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PaymentReferenceId").field(&self.0).finish()
    }
}

impl fmt::Display for PaymentReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<Cow<'_, str>> for PaymentReferenceId {
    type Error = error_stack::Report<ValidationError>;

    fn try_from(value: Cow<'_, str>) -> Result<Self, Self::Error> {
        let invalid = value.is_empty()
            || value
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        if invalid {
            return Err(error_stack::report!(ValidationError::IncorrectValueProvided {
                field_name: "payment_reference_id",
            })
            .attach_printable(format!("rejected payment reference id `{value}`")));
        }
        Ok(Self(value.into_owned()))
    }
}

impl<'de> Deserialize<'de> for PaymentReferenceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::try_from(Cow::Owned(raw)).map_err(|report| {
            serde::de::Error::custom(report.current_context().to_string())
        })
    }
}

impl std::str::FromStr for PaymentReferenceId {
    type Err = error_stack::Report<ValidationError>;

    fn from_str(s: &str) -> CustomResult<Self, ValidationError> {
        Self::try_from(Cow::Borrowed(s))
    }
}
