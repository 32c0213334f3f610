//! Low-level database plumbing. Functions here take `&mut SqliteConnection`
//! so they compose into transactions; the trait impls in
//! [`super::sqlite_impl`] own the pool.

pub mod clients;
pub mod contacts;
pub mod payments;

use std::str::FromStr;

use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

pub fn db_url() -> String {
    std::env::var("TEG_DATABASE_URL").unwrap_or_else(|_| {
        warn!("🗃️ TEG_DATABASE_URL not set, using sqlite://data/evaluations.db");
        "sqlite://data/evaluations.db".to_string()
    })
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    debug!("🗃️ Connected to database {url} with {max_connections} connection(s)");
    Ok(pool)
}

/// Create the schema if it does not exist yet. Safe to run on every start.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            payment_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'received',
            plan TEXT NOT NULL,
            platform TEXT NOT NULL,
            amount INTEGER NOT NULL,
            customer_name TEXT NOT NULL,
            customer_email TEXT NOT NULL,
            customer_phone TEXT,
            customer_document TEXT NOT NULL,
            payment_method TEXT,
            sale_date DATETIME NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_payment_id ON payments (payment_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            cpf TEXT NOT NULL,
            phone TEXT NOT NULL,
            birth_date DATE,
            email TEXT NOT NULL,
            address TEXT,
            zip_code TEXT,
            platform TEXT NOT NULL,
            plan TEXT NOT NULL,
            trader_status TEXT NOT NULL DEFAULT 'Aguardando Inicio',
            observation TEXT,
            start_date DATETIME,
            end_date DATETIME,
            cancellation_date DATETIME,
            broker_customer_id TEXT,
            broker_subscription_id TEXT,
            broker_license_id TEXT,
            broker_account TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id INTEGER NOT NULL REFERENCES clients (id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'Sem contato',
            contact_date DATETIME NOT NULL,
            notes TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )"#,
    )
    .execute(pool)
    .await?;
    debug!("🗃️ Schema is up to date");
    Ok(())
}
