use crate::{
    db_types::{Client, Contact, NewContact, TraderStatus},
    traits::{ClientStore, ClientStoreError, ContactLog, ContactLogError},
};

/// Operator-facing client management: status-filtered listings, record
/// maintenance, and the outreach contact log.
#[derive(Debug, Clone)]
pub struct ClientApi<B> {
    db: B,
}

impl<B> ClientApi<B>
where
    B: ClientStore + ContactLog,
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn client(&self, id: i64) -> Result<Option<Client>, ClientStoreError> {
        self.db.fetch_client(id).await
    }

    pub async fn awaiting_clients(&self) -> Result<Vec<Client>, ClientStoreError> {
        self.db.fetch_clients_by_status(TraderStatus::Waiting).await
    }

    pub async fn evaluating_clients(&self) -> Result<Vec<Client>, ClientStoreError> {
        self.db.fetch_clients_by_status(TraderStatus::InProgress).await
    }

    pub async fn rejected_clients(&self) -> Result<Vec<Client>, ClientStoreError> {
        self.db.fetch_clients_by_status(TraderStatus::Rejected).await
    }

    pub async fn update_client(&self, client: &Client) -> Result<Client, ClientStoreError> {
        self.db.update_client(client).await
    }

    pub async fn delete_client(&self, id: i64) -> Result<(), ClientStoreError> {
        self.db.delete_client(id).await
    }

    pub async fn add_contact(&self, contact: NewContact) -> Result<Contact, ContactLogError> {
        self.db.add_contact(contact).await
    }

    pub async fn contact_history(&self, client_id: i64) -> Result<Vec<Contact>, ContactLogError> {
        self.db.contact_history(client_id).await
    }
}
