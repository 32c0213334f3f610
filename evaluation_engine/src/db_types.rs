//! Data objects for the evaluation gateway.
//!
//! Status enums persist as the operator-facing Portuguese labels, since those
//! labels are what the back office and its reports have always used.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use teg_common::Cents;
use thiserror::Error;

//--------------------------------------     TraderStatus     -----------------------------------------------

/// Where a client sits in the evaluation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TraderStatus {
    #[serde(rename = "Aguardando Inicio")]
    #[sqlx(rename = "Aguardando Inicio")]
    Waiting,
    #[serde(rename = "Em Curso")]
    #[sqlx(rename = "Em Curso")]
    InProgress,
    #[serde(rename = "Aprovado")]
    #[sqlx(rename = "Aprovado")]
    Approved,
    #[serde(rename = "Reprovado")]
    #[sqlx(rename = "Reprovado")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal trader status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TraderStatus,
    pub to: TraderStatus,
}

impl TraderStatus {
    /// The evaluation state machine. `Waiting -> InProgress` and
    /// `InProgress -> {Approved, Rejected}` are the only legal moves; in
    /// particular there is no exit from a terminal state and no silent no-op
    /// for same-state writes.
    pub fn verify_transition(self, to: TraderStatus) -> Result<(), InvalidTransition> {
        use TraderStatus::*;
        match (self, to) {
            (Waiting, InProgress) | (InProgress, Approved) | (InProgress, Rejected) => Ok(()),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TraderStatus::Approved | TraderStatus::Rejected)
    }
}

impl Display for TraderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TraderStatus::Waiting => "Aguardando Inicio",
            TraderStatus::InProgress => "Em Curso",
            TraderStatus::Approved => "Aprovado",
            TraderStatus::Rejected => "Reprovado",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("'{0}' is not a trader status")]
pub struct StatusConversionError(pub String);

impl std::str::FromStr for TraderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aguardando Inicio" => Ok(TraderStatus::Waiting),
            "Em Curso" => Ok(TraderStatus::InProgress),
            "Aprovado" => Ok(TraderStatus::Approved),
            "Reprovado" => Ok(TraderStatus::Rejected),
            other => Err(StatusConversionError(other.to_string())),
        }
    }
}

//--------------------------------------     PaymentStatus     ----------------------------------------------

/// A payment is `Received` when the webhook lands and `Completed` once the
/// client has registered against it. A completed payment can never be
/// consumed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Received,
    Completed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Received => write!(f, "received"),
            PaymentStatus::Completed => write!(f, "completed"),
        }
    }
}

//--------------------------------------     ContactStatus     ----------------------------------------------

/// Outcome of an outreach attempt to a rejected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ContactStatus {
    #[serde(rename = "Sem contato")]
    #[sqlx(rename = "Sem contato")]
    NotContacted,
    #[serde(rename = "Contatado")]
    #[sqlx(rename = "Contatado")]
    Contacted,
    #[serde(rename = "Não Interessado")]
    #[sqlx(rename = "Não Interessado")]
    NotInterested,
    #[serde(rename = "Convertido")]
    #[sqlx(rename = "Convertido")]
    Converted,
}

impl Display for ContactStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ContactStatus::NotContacted => "Sem contato",
            ContactStatus::Contacted => "Contatado",
            ContactStatus::NotInterested => "Não Interessado",
            ContactStatus::Converted => "Convertido",
        };
        write!(f, "{label}")
    }
}

//--------------------------------------     Payment     ----------------------------------------------------

/// A canonical payment event, keyed by the upstream invoice id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    /// The upstream invoice id. Unique; webhook replays resolve to the
    /// existing row.
    pub payment_id: String,
    pub status: PaymentStatus,
    pub plan: String,
    pub platform: String,
    pub amount: Cents,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_document: String,
    pub payment_method: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub payment_id: String,
    pub plan: String,
    pub platform: String,
    pub amount: Cents,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_document: String,
    pub payment_method: Option<String>,
    pub sale_date: DateTime<Utc>,
}

//--------------------------------------     Client     -----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    /// Normalised to bare digits on ingest.
    pub cpf: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub email: String,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub platform: String,
    pub plan: String,
    pub trader_status: TraderStatus,
    pub observation: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub broker_customer_id: Option<String>,
    pub broker_subscription_id: Option<String>,
    pub broker_license_id: Option<String>,
    pub broker_account: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// The (license id, account) pair, present only when both halves of the
    /// linkage exist. Provisioning writes them atomically, so one without the
    /// other means the row predates provisioning.
    pub fn provisioned_account(&self) -> Option<(&str, &str)> {
        match (self.broker_license_id.as_deref(), self.broker_account.as_deref()) {
            (Some(license), Some(account)) => Some((license, account)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub email: String,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub platform: String,
    pub plan: String,
    pub observation: Option<String>,
}

/// The four broker ids captured when provisioning succeeds. Written as one
/// value so a row never ends up with half a linkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerLinkage {
    pub customer_id: String,
    pub subscription_id: String,
    pub license_id: String,
    pub account: String,
}

//--------------------------------------     Contact     ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub client_id: i64,
    pub status: ContactStatus,
    pub contact_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContact {
    pub client_id: i64,
    pub status: ContactStatus,
    pub contact_date: DateTime<Utc>,
    pub notes: Option<String>,
}

//--------------------------------------     Helpers     ----------------------------------------------------

/// Strip a CPF down to its digits. Everything else (dots, dashes, spaces) is
/// formatting.
pub fn normalize_cpf(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
