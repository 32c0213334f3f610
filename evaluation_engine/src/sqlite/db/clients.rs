use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{normalize_cpf, BrokerLinkage, Client, InvalidTransition, NewClient, TraderStatus},
    traits::ClientStoreError,
};

pub async fn insert_client(client: NewClient, conn: &mut SqliteConnection) -> Result<Client, ClientStoreError> {
    let cpf = normalize_cpf(&client.cpf);
    let res = sqlx::query(
        r#"INSERT INTO clients
           (name, cpf, phone, birth_date, email, address, zip_code, platform, plan, observation)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&client.name)
    .bind(&cpf)
    .bind(&client.phone)
    .bind(client.birth_date)
    .bind(&client.email)
    .bind(&client.address)
    .bind(&client.zip_code)
    .bind(&client.platform)
    .bind(&client.plan)
    .bind(&client.observation)
    .execute(&mut *conn)
    .await?;
    let id = res.last_insert_rowid();
    debug!("🗃️ Client #{id} ({}) created", client.email);
    fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))
}

pub async fn fetch_client(id: i64, conn: &mut SqliteConnection) -> Result<Option<Client>, ClientStoreError> {
    let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(client)
}

pub async fn fetch_client_by_cpf_or_email(
    cpf: &str,
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Client>, ClientStoreError> {
    let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE cpf = ? OR email = ? LIMIT 1")
        .bind(normalize_cpf(cpf))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(client)
}

pub async fn fetch_clients_by_status(
    status: TraderStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Client>, ClientStoreError> {
    let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE trader_status = ? ORDER BY created_at DESC")
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;
    Ok(clients)
}

pub async fn update_broker_linkage(
    id: i64,
    linkage: BrokerLinkage,
    conn: &mut SqliteConnection,
) -> Result<Client, ClientStoreError> {
    let res = sqlx::query(
        r#"UPDATE clients SET
             broker_customer_id = ?,
             broker_subscription_id = ?,
             broker_license_id = ?,
             broker_account = ?,
             updated_at = CURRENT_TIMESTAMP
           WHERE id = ?"#,
    )
    .bind(&linkage.customer_id)
    .bind(&linkage.subscription_id)
    .bind(&linkage.license_id)
    .bind(&linkage.account)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(ClientStoreError::ClientNotFound(id));
    }
    info!("🗃️ Client #{id} linked to broker account {}", linkage.account);
    fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))
}

/// Move a client into `InProgress`, guarding the expected status inside the
/// UPDATE so concurrent starts resolve to one winner.
pub async fn start_evaluation(
    id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Client, ClientStoreError> {
    let client = fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))?;
    client.trader_status.verify_transition(TraderStatus::InProgress)?;
    let res = sqlx::query(
        r#"UPDATE clients SET
             trader_status = ?, start_date = ?, end_date = ?, updated_at = CURRENT_TIMESTAMP
           WHERE id = ? AND trader_status = ?"#,
    )
    .bind(TraderStatus::InProgress)
    .bind(start)
    .bind(end)
    .bind(id)
    .bind(client.trader_status)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        // Someone else moved the client between our fetch and the update.
        let current = fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))?;
        return Err(ClientStoreError::InvalidTransition(InvalidTransition {
            from: current.trader_status,
            to: TraderStatus::InProgress,
        }));
    }
    info!("🗃️ Client #{id} evaluation started, running until {end}");
    fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))
}

/// Move a client into a terminal status. The end and cancellation dates get
/// the same timestamp.
pub async fn finish_evaluation(
    id: i64,
    status: TraderStatus,
    ended_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Client, ClientStoreError> {
    let client = fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))?;
    client.trader_status.verify_transition(status)?;
    let res = sqlx::query(
        r#"UPDATE clients SET
             trader_status = ?, end_date = ?, cancellation_date = ?, updated_at = CURRENT_TIMESTAMP
           WHERE id = ? AND trader_status = ?"#,
    )
    .bind(status)
    .bind(ended_at)
    .bind(ended_at)
    .bind(id)
    .bind(client.trader_status)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        let current = fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))?;
        return Err(ClientStoreError::InvalidTransition(InvalidTransition {
            from: current.trader_status,
            to: status,
        }));
    }
    info!("🗃️ Client #{id} evaluation finished as {status}");
    fetch_client(id, conn).await?.ok_or(ClientStoreError::ClientNotFound(id))
}

pub async fn update_client(client: &Client, conn: &mut SqliteConnection) -> Result<Client, ClientStoreError> {
    let res = sqlx::query(
        r#"UPDATE clients SET
             name = ?, cpf = ?, phone = ?, birth_date = ?, email = ?, address = ?, zip_code = ?,
             platform = ?, plan = ?, observation = ?, updated_at = CURRENT_TIMESTAMP
           WHERE id = ?"#,
    )
    .bind(&client.name)
    .bind(normalize_cpf(&client.cpf))
    .bind(&client.phone)
    .bind(client.birth_date)
    .bind(&client.email)
    .bind(&client.address)
    .bind(&client.zip_code)
    .bind(&client.platform)
    .bind(&client.plan)
    .bind(&client.observation)
    .bind(client.id)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(ClientStoreError::ClientNotFound(client.id));
    }
    fetch_client(client.id, conn).await?.ok_or(ClientStoreError::ClientNotFound(client.id))
}

pub async fn delete_client(id: i64, conn: &mut SqliteConnection) -> Result<(), ClientStoreError> {
    let res = sqlx::query("DELETE FROM clients WHERE id = ?").bind(id).execute(&mut *conn).await?;
    if res.rows_affected() == 0 {
        return Err(ClientStoreError::ClientNotFound(id));
    }
    info!("🗃️ Client #{id} deleted");
    Ok(())
}
