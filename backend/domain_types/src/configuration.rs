use common_enums::Environment;
use common_utils::Locale;

/// Shopper facing configuration forwarded to the payment session.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub shopper_locale: Locale,
    #[serde(default)]
    pub environment: Environment,
}

impl Configuration {
    pub fn new(shopper_locale: Locale, environment: Environment) -> Self {
        Self {
            shopper_locale,
            environment,
        }
    }

    pub fn base_url(&self) -> &'static str {
        self.environment.base_url()
    }
}
