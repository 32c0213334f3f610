use log::*;

use crate::{
    db_types::{Client, NewClient, NewPayment, Payment},
    traits::{ClientStore, ClientStoreError, PaymentStore, PaymentStoreError},
};

/// The payment → registration pipeline.
///
/// A payment event lands via the webhook, sits in `received` status until the
/// trader fills in the registration form, and is consumed exactly once when
/// the client record is created.
#[derive(Debug, Clone)]
pub struct PaymentFlowApi<B> {
    db: B,
}

impl<B> PaymentFlowApi<B>
where
    B: PaymentStore + ClientStore,
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Record an incoming payment. Replays of an already-seen invoice id
    /// return the stored record untouched.
    pub async fn process_payment(&self, payment: NewPayment) -> Result<(Payment, bool), PaymentStoreError> {
        let payment_id = payment.payment_id.clone();
        let (stored, inserted) = self.db.insert_payment(payment).await?;
        if inserted {
            info!("🔄️ Payment {payment_id} recorded for plan {} ({})", stored.plan, stored.amount);
        } else {
            info!("🔄️ Payment {payment_id} replayed. Returning the existing record");
        }
        Ok((stored, inserted))
    }

    /// Check whether a payment can still back a registration.
    pub async fn validate_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError> {
        self.db.fetch_receivable_payment(payment_id).await
    }

    /// Consume a receivable payment and create the client, atomically. The
    /// new client always starts in `Aguardando Inicio`.
    pub async fn process_registration(
        &self,
        payment_id: &str,
        client: NewClient,
    ) -> Result<(Payment, Client), PaymentStoreError> {
        let (payment, client) = self.db.process_registration(payment_id, client).await?;
        info!("🔄️ Payment {payment_id} consumed. Client #{} ({}) awaits evaluation", client.id, client.email);
        Ok((payment, client))
    }

    /// Duplicate check for the registration portal.
    pub async fn find_client(&self, cpf: &str, email: &str) -> Result<Option<Client>, ClientStoreError> {
        self.db.fetch_client_by_cpf_or_email(cpf, email).await
    }
}
