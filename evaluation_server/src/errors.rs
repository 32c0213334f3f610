use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use broker_tools::{
    error::{UnknownPlanError, UnknownProductError},
    BrokerApiError,
};
use evaluation_engine::{
    db_types::InvalidTransition,
    traits::{ClientStoreError, ContactLogError, PaymentStoreError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Illegal evaluation transition. {0}")]
    InvalidTransition(#[from] InvalidTransition),
    #[error("The client has no provisioned broker account yet")]
    NotProvisioned,
    #[error("No broker profile exists for plan '{0}'")]
    UnknownPlan(String),
    #[error("The broker call failed. {0}")]
    BrokerError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload | Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) | Self::NotProvisioned => StatusCode::CONFLICT,
            Self::UnknownPlan(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BrokerError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) | Self::BackendError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The webhook token is missing or does not match.")]
    InvalidWebhookToken,
    #[error("The API key is missing or does not match.")]
    InvalidApiKey,
}

impl From<PaymentStoreError> for ServerError {
    fn from(e: PaymentStoreError) -> Self {
        match e {
            PaymentStoreError::PaymentNotFound(id) => Self::NoRecordFound(format!("Payment {id}")),
            PaymentStoreError::NotReceivable(id, _) => {
                Self::NoRecordFound(format!("Payment {id} was already processed"))
            },
            PaymentStoreError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<ClientStoreError> for ServerError {
    fn from(e: ClientStoreError) -> Self {
        match e {
            ClientStoreError::ClientNotFound(id) => Self::NoRecordFound(format!("Client {id}")),
            ClientStoreError::InvalidTransition(t) => Self::InvalidTransition(t),
            ClientStoreError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<ContactLogError> for ServerError {
    fn from(e: ContactLogError) -> Self {
        match e {
            ContactLogError::ClientNotFound(id) => Self::NoRecordFound(format!("Client {id}")),
            ContactLogError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<BrokerApiError> for ServerError {
    fn from(e: BrokerApiError) -> Self {
        Self::BrokerError(e.to_string())
    }
}

impl From<UnknownPlanError> for ServerError {
    fn from(e: UnknownPlanError) -> Self {
        Self::UnknownPlan(e.0)
    }
}

impl From<UnknownProductError> for ServerError {
    fn from(e: UnknownProductError) -> Self {
        Self::InvalidRequestBody(e.to_string())
    }
}
