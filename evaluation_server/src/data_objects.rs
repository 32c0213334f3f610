use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use evaluation_engine::db_types::{Client, ContactStatus, NewClient, Payment, TraderStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body returned to the checkout platform after a webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_url: Option<String>,
}

impl WebhookAck {
    pub fn ignored(reason: &str) -> Self {
        Self { message: format!("Event ignored: {reason}"), payment_id: None, registration_url: None }
    }

    pub fn processed(payment_id: String, registration_url: String) -> Self {
        Self {
            message: "Payment processed".to_string(),
            payment_id: Some(payment_id),
            registration_url: Some(registration_url),
        }
    }
}

/// What the registration portal needs to pre-fill its form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: i64,
    pub platform: String,
    pub plan: String,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_document: String,
}

impl From<&Payment> for PaymentSummary {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id,
            platform: p.platform.clone(),
            plan: p.plan.clone(),
            customer_email: p.customer_email.clone(),
            customer_name: p.customer_name.clone(),
            customer_document: p.customer_document.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePaymentResponse {
    pub valid: bool,
    pub payment_data: PaymentSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckClientResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_data: Option<Client>,
}

/// The registration form payload submitted by the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    pub payment_id: String,
    pub platform: String,
    pub plan: String,
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub observation: Option<String>,
}

impl RegistrationData {
    pub fn into_new_client(self) -> NewClient {
        NewClient {
            name: self.name,
            cpf: self.cpf,
            phone: self.phone,
            birth_date: self.birth_date,
            email: self.email,
            address: self.address,
            zip_code: self.zip_code,
            platform: self.platform,
            plan: self.plan,
            observation: self.observation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationProcessed {
    pub message: String,
    pub evaluation_id: i64,
}

/// `Aprovado` or `Reprovado`. Deserialization rejects anything else, and the
/// engine's transition check rejects non-terminal targets anyway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishEvaluationRequest {
    pub status: TraderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactRequest {
    pub status: ContactStatus,
    #[serde(default)]
    pub contact_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}
