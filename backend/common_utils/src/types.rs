//! Types that can be used in other crates

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CustomResult, ValidationError};

#[allow(clippy::expect_used)]
static LOCALE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<language>[a-zA-Z]{2,3})(?:[-_](?P<country>[a-zA-Z]{2}|[0-9]{3}))?$")
        .expect("locale pattern must compile")
});

/// Shopper locale in `language[-COUNTRY]` form.
///
/// Accepts both `en-US` and `en_US` and normalises to a lowercase language with an uppercase
/// country, which is what the checkout API expects in `shopperLocale`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    country: Option<String>,
}

impl Locale {
    pub fn new(language: &str, country: Option<&str>) -> CustomResult<Self, ValidationError> {
        match country {
            Some(country) => format!("{language}-{country}").parse(),
            None => language.parse(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: Some("US".to_string()),
        }
    }
}

impl FromStr for Locale {
    type Err = error_stack::Report<ValidationError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let captures = LOCALE_PATTERN.captures(value.trim()).ok_or_else(|| {
            error_stack::report!(ValidationError::InvalidValue {
                message: format!("Invalid shopper locale `{value}`"),
            })
        })?;

        let language = captures
            .name("language")
            .map(|language| language.as_str().to_ascii_lowercase())
            .ok_or_else(|| {
                error_stack::report!(ValidationError::MissingRequiredField {
                    field_name: "language".to_string(),
                })
            })?;
        let country = captures
            .name("country")
            .map(|country| country.as_str().to_ascii_uppercase());

        Ok(Self { language, country })
    }
}

impl TryFrom<String> for Locale {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|report: error_stack::Report<ValidationError>| {
                report.current_context().clone()
            })
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}-{}", self.language, country),
            None => f.write_str(&self.language),
        }
    }
}
