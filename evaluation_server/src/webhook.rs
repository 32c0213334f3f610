//! The checkout platform's webhook payload and its conversion into a
//! [`NewPayment`].
//!
//! The platform delivers every lifecycle event to the same URL and retries
//! anything that does not get a 2xx back, so events we do not care about are
//! *acknowledged*, never rejected.

use broker_tools::{error::UnknownProductError, profiles::plan_from_product_name};
use chrono::{DateTime, Utc};
use evaluation_engine::db_types::{normalize_cpf, NewPayment};
use serde::{Deserialize, Serialize};
use teg_common::Cents;

/// The only event that creates a payment.
pub const PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
/// All evaluation accounts run on this platform.
pub const PLATFORM_LABEL: &str = "Black Arrow Pro";
/// Sandbox deliveries sometimes omit the document.
pub const DOCUMENT_FALLBACK: &str = "00000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub version: String,
    pub event: EventBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBody {
    pub product: ProductInfo,
    pub invoice: InvoiceInfo,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInfo {
    pub id: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub payer_id: String,
    pub status: String,
    pub amount: AmountInfo,
    pub sale_date: DateTime<Utc>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountInfo {
    pub total_cents: i64,
    #[serde(default)]
    pub subtotal_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

/// What to do with a delivery: record a payment, or ack it with a reason.
#[derive(Debug, Clone)]
pub enum Disposition {
    Payment(NewPayment),
    Ignored(String),
}

/// Apply the event filter and map the payload onto a [`NewPayment`].
///
/// Order bumps (invoice ids containing `-offer-`) piggyback on the main
/// invoice and never carry their own evaluation, so they are acknowledged
/// without creating anything. An unrecognised product name is a hard error:
/// we refuse to invent a plan.
pub fn extract_payment(event: WebhookEvent) -> Result<Disposition, UnknownProductError> {
    if event.event_type != PAYMENT_SUCCEEDED {
        return Ok(Disposition::Ignored(format!("event type is '{}'", event.event_type)));
    }
    let invoice = &event.event.invoice;
    if invoice.status != "paid" {
        return Ok(Disposition::Ignored(format!("invoice status is '{}'", invoice.status)));
    }
    if invoice.id.contains("-offer-") {
        return Ok(Disposition::Ignored(format!("invoice {} is an order bump", invoice.id)));
    }
    let plan = plan_from_product_name(&event.event.product.name)?;
    let user = &event.event.user;
    let document = user
        .document
        .as_deref()
        .map(normalize_cpf)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DOCUMENT_FALLBACK.to_string());
    let payment = NewPayment {
        payment_id: invoice.id.clone(),
        plan: plan.to_string(),
        platform: PLATFORM_LABEL.to_string(),
        amount: Cents::from(invoice.amount.total_cents),
        customer_name: format!("{} {}", user.first_name, user.last_name).trim().to_string(),
        customer_email: user.email.clone(),
        customer_phone: user.phone.clone(),
        customer_document: document,
        payment_method: invoice.payment_method.clone(),
        sale_date: invoice.sale_date,
    };
    Ok(Disposition::Payment(payment))
}
