use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    BrokerLinkage, Client, Contact, InvalidTransition, NewClient, NewContact, TraderStatus,
};

#[derive(Debug, Error)]
pub enum ClientStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Client {0} was not found")]
    ClientNotFound(i64),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl From<sqlx::Error> for ClientStoreError {
    fn from(e: sqlx::Error) -> Self {
        ClientStoreError::DatabaseError(e.to_string())
    }
}

/// Storage for clients and their walk through the evaluation state machine.
///
/// The status-changing operations re-check the expected status inside the
/// UPDATE itself, so a race between two operators resolves to one winner and
/// one [`ClientStoreError::InvalidTransition`].
#[allow(async_fn_in_trait)]
pub trait ClientStore {
    async fn insert_client(&self, client: NewClient) -> Result<Client, ClientStoreError>;

    async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientStoreError>;

    /// Lookup by either normalised CPF or email, for duplicate checks at
    /// registration time.
    async fn fetch_client_by_cpf_or_email(&self, cpf: &str, email: &str)
        -> Result<Option<Client>, ClientStoreError>;

    async fn fetch_clients_by_status(&self, status: TraderStatus) -> Result<Vec<Client>, ClientStoreError>;

    /// Record the broker ids captured by provisioning. Does not touch the
    /// trader status.
    async fn update_broker_linkage(&self, id: i64, linkage: BrokerLinkage) -> Result<Client, ClientStoreError>;

    /// `Waiting -> InProgress`, stamping the evaluation window.
    async fn start_evaluation(
        &self,
        id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Client, ClientStoreError>;

    /// `InProgress -> Approved | Rejected`. The end and cancellation dates
    /// are both set to `ended_at`.
    async fn finish_evaluation(
        &self,
        id: i64,
        status: TraderStatus,
        ended_at: DateTime<Utc>,
    ) -> Result<Client, ClientStoreError>;

    /// Update the identity and program fields. Status and broker linkage are
    /// out of scope here; they have their own operations.
    async fn update_client(&self, client: &Client) -> Result<Client, ClientStoreError>;

    /// Remove a client. Their contact history goes with them.
    async fn delete_client(&self, id: i64) -> Result<(), ClientStoreError>;
}

#[derive(Debug, Error)]
pub enum ContactLogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Client {0} was not found")]
    ClientNotFound(i64),
}

impl From<sqlx::Error> for ContactLogError {
    fn from(e: sqlx::Error) -> Self {
        ContactLogError::DatabaseError(e.to_string())
    }
}

/// Append-only log of outreach attempts to rejected clients.
#[allow(async_fn_in_trait)]
pub trait ContactLog {
    async fn add_contact(&self, contact: NewContact) -> Result<Contact, ContactLogError>;

    /// Full history for a client, most recent contact first.
    async fn contact_history(&self, client_id: i64) -> Result<Vec<Contact>, ContactLogError>;
}
