use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Contact, NewContact},
    traits::ContactLogError,
};

pub async fn add_contact(contact: NewContact, conn: &mut SqliteConnection) -> Result<Contact, ContactLogError> {
    let known: Option<i64> = sqlx::query_scalar("SELECT id FROM clients WHERE id = ?")
        .bind(contact.client_id)
        .fetch_optional(&mut *conn)
        .await?;
    if known.is_none() {
        return Err(ContactLogError::ClientNotFound(contact.client_id));
    }
    let res = sqlx::query("INSERT INTO contacts (client_id, status, contact_date, notes) VALUES (?, ?, ?, ?)")
        .bind(contact.client_id)
        .bind(contact.status)
        .bind(contact.contact_date)
        .bind(&contact.notes)
        .execute(&mut *conn)
        .await?;
    let id = res.last_insert_rowid();
    debug!("🗃️ Contact #{id} logged for client #{}", contact.client_id);
    let stored = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(stored)
}

pub async fn contact_history(client_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Contact>, ContactLogError> {
    let contacts =
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE client_id = ? ORDER BY contact_date DESC")
            .bind(client_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(contacts)
}
