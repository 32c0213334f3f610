use chrono::{DateTime, Utc};
use mockall::mock;
use broker_tools::{
    data_objects::{AccountData, NewAccount, NewSubscription, SubscriptionData},
    BrokerApiError,
    BrokerClient,
};
use evaluation_engine::{
    db_types::{
        BrokerLinkage,
        Client,
        Contact,
        NewClient,
        NewContact,
        NewPayment,
        Payment,
        TraderStatus,
    },
    traits::{
        ClientStore,
        ClientStoreError,
        ContactLog,
        ContactLogError,
        PaymentStore,
        PaymentStoreError,
    },
};

use crate::notify::{NotifyError, RegistrationNotifier};

mock! {
    pub Store {}
    impl PaymentStore for Store {
        async fn insert_payment(&self, payment: NewPayment) -> Result<(Payment, bool), PaymentStoreError>;
        async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError>;
        async fn fetch_receivable_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentStoreError>;
        async fn complete_payment(&self, payment_id: &str) -> Result<Payment, PaymentStoreError>;
        async fn process_registration(&self, payment_id: &str, client: NewClient) -> Result<(Payment, Client), PaymentStoreError>;
    }
    impl ClientStore for Store {
        async fn insert_client(&self, client: NewClient) -> Result<Client, ClientStoreError>;
        async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientStoreError>;
        async fn fetch_client_by_cpf_or_email(&self, cpf: &str, email: &str) -> Result<Option<Client>, ClientStoreError>;
        async fn fetch_clients_by_status(&self, status: TraderStatus) -> Result<Vec<Client>, ClientStoreError>;
        async fn update_broker_linkage(&self, id: i64, linkage: BrokerLinkage) -> Result<Client, ClientStoreError>;
        async fn start_evaluation(&self, id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Client, ClientStoreError>;
        async fn finish_evaluation(&self, id: i64, status: TraderStatus, ended_at: DateTime<Utc>) -> Result<Client, ClientStoreError>;
        async fn update_client(&self, client: &Client) -> Result<Client, ClientStoreError>;
        async fn delete_client(&self, id: i64) -> Result<(), ClientStoreError>;
    }
    impl ContactLog for Store {
        async fn add_contact(&self, contact: NewContact) -> Result<Contact, ContactLogError>;
        async fn contact_history(&self, client_id: i64) -> Result<Vec<Contact>, ContactLogError>;
    }
}

mock! {
    pub Broker {}
    impl BrokerClient for Broker {
        async fn create_subscription(&self, subscription: &NewSubscription) -> Result<SubscriptionData, BrokerApiError>;
        async fn create_accounts(&self, license_id: &str, accounts: &[NewAccount]) -> Result<Vec<AccountData>, BrokerApiError>;
        async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BrokerApiError>;
        async fn set_account_risk(&self, license_id: &str, account: &str, profile_id: &str) -> Result<(), BrokerApiError>;
        async fn block_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError>;
        async fn unblock_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError>;
        async fn remove_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError>;
    }
}

mock! {
    pub Notifier {}
    impl RegistrationNotifier for Notifier {
        async fn send_registration_link(&self, name: &str, email: &str, registration_url: &str) -> Result<(), NotifyError>;
    }
}
