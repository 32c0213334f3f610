use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Broker authentication failed: {0}")]
    AuthenticationError(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Broker rejected the call. Status {status}. {message}")]
    QueryError { status: i64, message: String },
    #[error("Broker response carried no payload: {0}")]
    EmptyResponse(String),
}

#[derive(Debug, Clone, Error)]
#[error("No risk profile is configured for plan '{0}'")]
pub struct UnknownPlanError(pub String);

#[derive(Debug, Clone, Error)]
#[error("Product name '{0}' does not map to a known plan")]
pub struct UnknownProductError(pub String);
