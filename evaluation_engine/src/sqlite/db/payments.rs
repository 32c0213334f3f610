use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment},
    traits::PaymentStoreError,
};

/// Insert a payment, deferring to the unique index on `payment_id` for
/// idempotency. Returns the stored record and whether this call created it.
pub async fn idempotent_insert(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<(Payment, bool), PaymentStoreError> {
    let res = sqlx::query(
        r#"INSERT INTO payments
           (payment_id, plan, platform, amount, customer_name, customer_email, customer_phone,
            customer_document, payment_method, sale_date)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT (payment_id) DO NOTHING"#,
    )
    .bind(&payment.payment_id)
    .bind(&payment.plan)
    .bind(&payment.platform)
    .bind(payment.amount)
    .bind(&payment.customer_name)
    .bind(&payment.customer_email)
    .bind(&payment.customer_phone)
    .bind(&payment.customer_document)
    .bind(&payment.payment_method)
    .bind(payment.sale_date)
    .execute(&mut *conn)
    .await?;
    let inserted = res.rows_affected() > 0;
    if !inserted {
        debug!("🗃️ Payment {} is already on record", payment.payment_id);
    }
    let stored = fetch_payment(&payment.payment_id, conn)
        .await?
        .ok_or_else(|| PaymentStoreError::DatabaseError(format!("payment {} vanished after insert", payment.payment_id)))?;
    Ok((stored, inserted))
}

pub async fn fetch_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentStoreError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = ?")
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_receivable_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentStoreError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = ? AND status = 'received'")
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(payment)
}

/// Flip a `received` payment to `completed`. The status guard in the WHERE
/// clause makes double-consumption lose cleanly.
pub async fn complete_payment(payment_id: &str, conn: &mut SqliteConnection) -> Result<Payment, PaymentStoreError> {
    let res = sqlx::query(
        "UPDATE payments SET status = 'completed', updated_at = CURRENT_TIMESTAMP \
         WHERE payment_id = ? AND status = 'received'",
    )
    .bind(payment_id)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return match fetch_payment(payment_id, conn).await? {
            Some(p) => Err(PaymentStoreError::NotReceivable(payment_id.to_string(), p.status)),
            None => Err(PaymentStoreError::PaymentNotFound(payment_id.to_string())),
        };
    }
    let payment = fetch_payment(payment_id, conn)
        .await?
        .ok_or_else(|| PaymentStoreError::PaymentNotFound(payment_id.to_string()))?;
    Ok(payment)
}
