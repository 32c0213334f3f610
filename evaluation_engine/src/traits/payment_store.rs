use thiserror::Error;

use crate::db_types::{Client, NewClient, NewPayment, Payment, PaymentStatus};

#[derive(Debug, Error)]
pub enum PaymentStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment {0} was not found")]
    PaymentNotFound(String),
    #[error("Payment {0} cannot be consumed while in status '{1}'")]
    NotReceivable(String, PaymentStatus),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        PaymentStoreError::DatabaseError(e.to_string())
    }
}

/// Storage for payment events arriving from the checkout platform.
#[allow(async_fn_in_trait)]
pub trait PaymentStore {
    /// Insert a payment keyed on its upstream invoice id. If the id is
    /// already known, the stored record is returned untouched along with
    /// `false`; a fresh insert returns `true`.
    async fn insert_payment(&self, payment: NewPayment) -> Result<(Payment, bool), PaymentStoreError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError>;

    /// Fetch a payment only if it is still in `received` status, i.e. it can
    /// back a new registration.
    async fn fetch_receivable_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError>;

    /// Mark a `received` payment as `completed`.
    async fn complete_payment(&self, payment_id: &str) -> Result<Payment, PaymentStoreError>;

    /// Consume a receivable payment and create its client in one
    /// transaction. Either both writes land or neither does.
    async fn process_registration(
        &self,
        payment_id: &str,
        client: NewClient,
    ) -> Result<(Payment, Client), PaymentStoreError>;
}
