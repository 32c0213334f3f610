//! Orchestration of the broker side of an evaluation.
//!
//! Every operation here talks to the broker *first* and only persists on
//! success, so the database never claims a state the broker has not reached.
//! The converse can happen (broker call succeeded, write failed); those cases
//! are logged with the remote ids so an operator can reconcile by hand.

use chrono::{Duration, Utc};
use evaluation_engine::{
    db_types::{BrokerLinkage, Client, TraderStatus},
    traits::ClientStore,
};
use log::*;
use broker_tools::{
    data_objects::{AddressParams, DocumentParams, NewAccount, NewSubscription},
    profiles::risk_profile_for_plan,
    BrokerClient,
};

use crate::errors::ServerError;

/// CPF in the broker's document-type enumeration.
const DOCUMENT_TYPE_CPF: i64 = 1;
/// Length of an evaluation window, from start to scheduled end.
const EVALUATION_DAYS: i64 = 60;
/// The broker truncates long account names, so we do it ourselves and keep
/// the plan suffix intact.
const ACCOUNT_NAME_LIMIT: usize = 20;

pub struct BrokerService<B, C>
where
    B: ClientStore,
    C: BrokerClient,
{
    db: B,
    broker: C,
}

impl<B, C> BrokerService<B, C>
where
    B: ClientStore,
    C: BrokerClient,
{
    pub fn new(db: B, broker: C) -> Self {
        Self { db, broker }
    }

    async fn required_client(&self, client_id: i64) -> Result<Client, ServerError> {
        self.db
            .fetch_client(client_id)
            .await?
            .ok_or_else(|| ServerError::NoRecordFound(format!("Client {client_id}")))
    }

    /// Create the subscription and challenge account for a registered client
    /// and store the resulting ids. The trader status is untouched; starting
    /// the evaluation is a separate, explicit step.
    pub async fn register_client_evaluation(&self, client_id: i64) -> Result<Client, ServerError> {
        let client = self.required_client(client_id).await?;
        // Resolve the risk profile before any remote call so an unknown plan
        // fails without creating anything on the broker.
        let profile_id = risk_profile_for_plan(&client.plan)?;
        info!("🎫️ Provisioning broker evaluation for client #{} ({})", client.id, client.plan);

        let subscription = self.broker.create_subscription(&new_subscription(&client)).await?;
        debug!(
            "🎫️ Broker subscription {} created under license {}",
            subscription.subscription_id, subscription.license_id
        );

        let account_name = challenge_account_name(&client.name, &client.plan);
        let new_accounts = [NewAccount { name: account_name, profile_id: profile_id.to_string() }];
        let accounts =
            match self.broker.create_accounts(&subscription.license_id, &new_accounts).await {
                Ok(accounts) => accounts,
                Err(e) => {
                    error!(
                        "🎫️ Account creation failed after subscription {} was created for client \
                         #{}. The subscription is live on the broker and needs manual attention. \
                         {e}",
                        subscription.subscription_id, client.id
                    );
                    return Err(e.into());
                },
            };
        let account = accounts
            .into_iter()
            .next()
            .ok_or_else(|| ServerError::BrokerError("Account creation returned no accounts".into()))?;

        let linkage = BrokerLinkage {
            customer_id: subscription.customer_id,
            subscription_id: subscription.subscription_id,
            license_id: subscription.license_id,
            account: account.account,
        };
        let updated = self.db.update_broker_linkage(client.id, linkage).await?;
        info!(
            "🎫️ Client #{} provisioned on broker account {}",
            updated.id,
            updated.broker_account.as_deref().unwrap_or_default()
        );
        Ok(updated)
    }

    /// Apply the plan's risk profile to the provisioned account and move the
    /// client to `InProgress` with a 60-day evaluation window.
    pub async fn start_evaluation(&self, client_id: i64) -> Result<Client, ServerError> {
        let client = self.required_client(client_id).await?;
        let (license_id, account) = client.provisioned_account().ok_or(ServerError::NotProvisioned)?;
        let profile_id = risk_profile_for_plan(&client.plan)?;
        info!("🎫️ Starting evaluation for client #{} on account {account}", client.id);

        self.broker.set_account_risk(license_id, account, profile_id).await?;

        let start = Utc::now();
        let end = start + Duration::days(EVALUATION_DAYS);
        let updated = self.db.start_evaluation(client.id, start, end).await?;
        info!("🎫️ Client #{} evaluation runs until {}", updated.id, end.format("%Y-%m-%d"));
        Ok(updated)
    }

    /// Remove the challenge account and record the verdict. Only `Approved`
    /// or `Rejected` are accepted; the stores reject anything else via the
    /// transition table anyway, but failing fast gives a clearer error.
    pub async fn finish_evaluation(
        &self,
        client_id: i64,
        status: TraderStatus,
    ) -> Result<Client, ServerError> {
        if !status.is_terminal() {
            return Err(ServerError::InvalidRequestBody(format!(
                "An evaluation can only be finished as approved or rejected, not {status}"
            )));
        }
        let client = self.required_client(client_id).await?;
        if client.broker_subscription_id.is_none() {
            return Err(ServerError::NotProvisioned);
        }
        let (license_id, account) = client.provisioned_account().ok_or(ServerError::NotProvisioned)?;
        info!("🎫️ Finishing evaluation for client #{} as {status}", client.id);

        self.broker.remove_account(license_id, account).await?;

        let updated = self.db.finish_evaluation(client.id, status, Utc::now()).await?;
        info!("🎫️ Client #{} evaluation closed as {status}", updated.id);
        Ok(updated)
    }
}

fn new_subscription(client: &Client) -> NewSubscription {
    let mut parts = client.name.split_whitespace();
    let first_name = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    // Single-word names repeat as the surname; the broker requires both.
    let last_name = if rest.is_empty() { first_name.clone() } else { rest };
    NewSubscription {
        first_name,
        last_name,
        email: client.email.clone(),
        phone_number: Some(client.phone.clone()),
        gender: None,
        birth: client.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
        country_nationality: None,
        document: Some(DocumentParams { document_type: DOCUMENT_TYPE_CPF, document: client.cpf.clone() }),
        address: Some(AddressParams {
            street: client.address.clone(),
            zip_code: client.zip_code.clone(),
            country: Some("BRA".to_string()),
            ..Default::default()
        }),
    }
}

fn challenge_account_name(name: &str, plan: &str) -> String {
    let head = name.chars().take(ACCOUNT_NAME_LIMIT).collect::<String>();
    format!("{} - {plan}", head.trim_end())
}
