//! Outbound mail to freshly paid customers.
//!
//! A notification failure never fails the webhook: the payment is already
//! recorded and the registration link can be re-sent by hand, so callers log
//! the error and carry on.

use log::*;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Could not reach the email service. {0}")]
    RequestError(String),
    #[error("The email service refused the message. {0}")]
    Rejected(String),
}

#[allow(async_fn_in_trait)]
pub trait RegistrationNotifier {
    /// Send the customer the link to complete their registration.
    async fn send_registration_link(
        &self,
        name: &str,
        email: &str,
        registration_url: &str,
    ) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: String,
}

/// Notifier backed by a transactional email HTTP API.
#[derive(Clone)]
pub struct EmailApiNotifier {
    config: EmailConfig,
    client: Client,
}

impl std::fmt::Debug for EmailApiNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailApiNotifier").field("config", &self.config).finish_non_exhaustive()
    }
}

impl EmailApiNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config, client: Client::new() }
    }
}

impl RegistrationNotifier for EmailApiNotifier {
    async fn send_registration_link(
        &self,
        name: &str,
        email: &str,
        registration_url: &str,
    ) -> Result<(), NotifyError> {
        debug!("📧️ Sending registration link to {email}");
        let message = EmailMessage {
            from: &self.config.sender,
            to: email,
            subject: "Complete seu Cadastro - Traders House",
            html: registration_email_body(name, registration_url),
        };
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.reveal())
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {body}")));
        }
        info!("📧️ Registration link sent to {email}");
        Ok(())
    }
}

fn registration_email_body(name: &str, registration_url: &str) -> String {
    format!(
        "<h2>Bem-vindo à Traders House, {name}!</h2>\
         <p>Recebemos o seu pagamento. Para liberar a sua avaliação, complete o seu cadastro \
         pelo link abaixo:</p>\
         <p><a href=\"{registration_url}\">Completar cadastro</a></p>\
         <p>Se o link não abrir, copie e cole este endereço no navegador:<br>{registration_url}</p>"
    )
}
