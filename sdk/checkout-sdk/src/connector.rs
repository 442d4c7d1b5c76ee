use common_utils::CustomResult;
use domain_types::{
    authentication::PaymentsDetailsRequest, configuration::Configuration, errors::ApiClientError,
    payment::PaymentsRequest,
};
use serde_json::Value;

/// Transport to the payment session endpoints, supplied by the host.
///
/// Implementations return the raw response body; decoding and action resolution happen in the
/// payment handler so that classification errors surface the same way for every transport.
#[async_trait::async_trait]
pub trait PaymentConnector: Send + Sync {
    async fn payments(
        &self,
        configuration: &Configuration,
        request: &PaymentsRequest,
    ) -> CustomResult<Value, ApiClientError>;

    async fn payments_details(
        &self,
        configuration: &Configuration,
        request: &PaymentsDetailsRequest,
    ) -> CustomResult<Value, ApiClientError>;
}
