use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db;
use crate::{
    db_types::{
        BrokerLinkage, Client, Contact, NewClient, NewContact, NewPayment, Payment, TraderStatus,
    },
    traits::{
        ClientStore, ClientStoreError, ContactLog, ContactLogError, PaymentStore, PaymentStoreError,
    },
};

/// SQLite implementation of the engine's storage traits.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").field("url", &self.url).finish()
    }
}

impl SqliteDatabase {
    /// Connect using the `TEG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    /// Connect to the given URL and bring the schema up to date. Use
    /// `sqlite::memory:` with a single connection for throwaway test stores.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = db::new_pool(url, max_connections).await?;
        db::create_schema(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentStore for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<(Payment, bool), PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::payments::idempotent_insert(payment, &mut conn).await
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::payments::fetch_payment(payment_id, &mut conn).await
    }

    async fn fetch_receivable_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::payments::fetch_receivable_payment(payment_id, &mut conn).await
    }

    async fn complete_payment(&self, payment_id: &str) -> Result<Payment, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::payments::complete_payment(payment_id, &mut conn).await
    }

    async fn process_registration(
        &self,
        payment_id: &str,
        client: NewClient,
    ) -> Result<(Payment, Client), PaymentStoreError> {
        let mut tx = self.pool.begin().await?;
        let payment = db::payments::complete_payment(payment_id, &mut tx).await?;
        let client = db::clients::insert_client(client, &mut tx)
            .await
            .map_err(|e| PaymentStoreError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        Ok((payment, client))
    }
}

impl ClientStore for SqliteDatabase {
    async fn insert_client(&self, client: NewClient) -> Result<Client, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::insert_client(client, &mut conn).await
    }

    async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::fetch_client(id, &mut conn).await
    }

    async fn fetch_client_by_cpf_or_email(
        &self,
        cpf: &str,
        email: &str,
    ) -> Result<Option<Client>, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::fetch_client_by_cpf_or_email(cpf, email, &mut conn).await
    }

    async fn fetch_clients_by_status(&self, status: TraderStatus) -> Result<Vec<Client>, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::fetch_clients_by_status(status, &mut conn).await
    }

    async fn update_broker_linkage(&self, id: i64, linkage: BrokerLinkage) -> Result<Client, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::update_broker_linkage(id, linkage, &mut conn).await
    }

    async fn start_evaluation(
        &self,
        id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Client, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::start_evaluation(id, start, end, &mut conn).await
    }

    async fn finish_evaluation(
        &self,
        id: i64,
        status: TraderStatus,
        ended_at: DateTime<Utc>,
    ) -> Result<Client, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::finish_evaluation(id, status, ended_at, &mut conn).await
    }

    async fn update_client(&self, client: &Client) -> Result<Client, ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::update_client(client, &mut conn).await
    }

    async fn delete_client(&self, id: i64) -> Result<(), ClientStoreError> {
        let mut conn = self.pool.acquire().await?;
        db::clients::delete_client(id, &mut conn).await
    }
}

impl ContactLog for SqliteDatabase {
    async fn add_contact(&self, contact: NewContact) -> Result<Contact, ContactLogError> {
        let mut conn = self.pool.acquire().await?;
        db::contacts::add_contact(contact, &mut conn).await
    }

    async fn contact_history(&self, client_id: i64) -> Result<Vec<Contact>, ContactLogError> {
        let mut conn = self.pool.acquire().await?;
        db::contacts::contact_history(client_id, &mut conn).await
    }
}
