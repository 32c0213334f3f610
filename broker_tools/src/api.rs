use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::{
    config::BrokerConfig,
    data_objects::{
        AccountData, AccountRisk, ApiEnvelope, AuthData, EnvironmentsPage, LoginRequest, NewAccount, NewSubscription,
        Pagination, RiskProfilesPage, SubscriptionData,
    },
    error::BrokerApiError,
    profiles::ACCOUNT_TYPE_CHALLENGE,
    session::SessionToken,
};

/// The subset of broker operations the provisioning workflow depends on.
/// [`BrokerApi`] is the production implementation; tests substitute mocks.
#[allow(async_fn_in_trait)]
pub trait BrokerClient {
    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<SubscriptionData, BrokerApiError>;
    async fn create_accounts(
        &self,
        license_id: &str,
        accounts: &[NewAccount],
    ) -> Result<Vec<AccountData>, BrokerApiError>;
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BrokerApiError>;
    async fn set_account_risk(&self, license_id: &str, account: &str, profile_id: &str)
        -> Result<(), BrokerApiError>;
    async fn block_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError>;
    async fn unblock_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError>;
    async fn remove_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError>;
}

/// Client for the broker's management REST API.
///
/// The session token lives behind a [`Mutex`] which is held for the whole of
/// a login round-trip. Concurrent callers that find the token stale therefore
/// queue on the lock and reuse the token the first caller fetched, so the
/// broker only ever sees one login per expiry.
pub struct BrokerApi {
    config: BrokerConfig,
    client: Client,
    session: Mutex<Option<SessionToken>>,
}

impl std::fmt::Debug for BrokerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerApi").field("config", &self.config).finish_non_exhaustive()
    }
}

impl BrokerApi {
    pub fn new(config: BrokerConfig) -> Result<Self, BrokerApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrokerApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client, session: Mutex::new(None) })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Force a login round-trip, replacing any cached token.
    pub async fn login(&self) -> Result<(), BrokerApiError> {
        let mut session = self.session.lock().await;
        let token = self.fetch_token().await?;
        *session = Some(token);
        Ok(())
    }

    /// Returns a bearer token, logging in first if the cached one is missing
    /// or inside its expiry margin.
    async fn access_token(&self) -> Result<String, BrokerApiError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            if token.is_valid() {
                return Ok(token.token().to_string());
            }
        }
        let token = self.fetch_token().await?;
        let value = token.token().to_string();
        *session = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<SessionToken, BrokerApiError> {
        debug!("🏦 Logging in to the broker API as {}", self.config.username);
        let body = LoginRequest {
            username: self.config.username.clone(),
            password: self.config.password.reveal().clone(),
        };
        let res = self
            .client
            .post(self.url("api/v2/auth/login"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BrokerApiError::AuthenticationError(e.to_string()))?;
        if !res.status().is_success() {
            return Err(BrokerApiError::AuthenticationError(format!("login returned HTTP {}", res.status())));
        }
        let envelope: ApiEnvelope<AuthData> =
            res.json().await.map_err(|e| BrokerApiError::JsonError(e.to_string()))?;
        if !envelope.is_success {
            return Err(BrokerApiError::AuthenticationError(envelope.message));
        }
        let auth = envelope
            .data
            .ok_or_else(|| BrokerApiError::AuthenticationError("login response carried no token".to_string()))?;
        let token = SessionToken::from(auth);
        info!("🏦 Broker session established, token valid until {}", token.expires_at());
        Ok(token)
    }

    /// Perform an authenticated call and unwrap the response envelope.
    /// Returns the envelope's `data` field, which may legitimately be absent.
    async fn rest_query<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Option<T>, BrokerApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.access_token().await?;
        let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| BrokerApiError::RestRequestError(e.to_string()))?;
        trace!("🏦 Sending {method} request to {path}");
        let mut req = self.client.request(method.clone(), self.url(path)).header(AUTHORIZATION, auth_value);
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req.send().await.map_err(|e| BrokerApiError::RestRequestError(e.to_string()))?;
        let http_status = res.status();
        if !http_status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(BrokerApiError::QueryError { status: http_status.as_u16() as i64, message });
        }
        let envelope: ApiEnvelope<T> = res.json().await.map_err(|e| BrokerApiError::JsonError(e.to_string()))?;
        if !envelope.is_success {
            return Err(BrokerApiError::QueryError { status: envelope.status, message: envelope.message });
        }
        Ok(envelope.data)
    }

    /// As [`rest_query`][Self::rest_query], but the payload is mandatory.
    async fn rest_fetch<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, BrokerApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.rest_query(method, path, body)
            .await?
            .ok_or_else(|| BrokerApiError::EmptyResponse(path.to_string()))
    }

    pub async fn list_environments(&self, page: Pagination) -> Result<EnvironmentsPage, BrokerApiError> {
        debug!("🏦 Listing broker environments");
        let path = format!("api/v2/commerce/environments{}", page.as_query());
        self.rest_fetch(Method::POST, &path, None::<&()>).await
    }

    pub async fn list_risk_profiles(
        &self,
        environment_id: &str,
        page: Pagination,
    ) -> Result<RiskProfilesPage, BrokerApiError> {
        debug!("🏦 Listing risk profiles for environment {environment_id}");
        let path = format!("api/v2/manager/risk/{environment_id}{}", page.as_query());
        self.rest_fetch(Method::GET, &path, None::<&()>).await
    }
}

impl BrokerClient for BrokerApi {
    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<SubscriptionData, BrokerApiError> {
        debug!("🏦 Creating broker subscription for {}", subscription.email);
        let data: SubscriptionData =
            self.rest_fetch(Method::POST, "api/v2/manager/subscriptions", Some(subscription)).await?;
        info!("🏦 Subscription {} created under license {}", data.subscription_id, data.license_id);
        Ok(data)
    }

    async fn create_accounts(
        &self,
        license_id: &str,
        accounts: &[NewAccount],
    ) -> Result<Vec<AccountData>, BrokerApiError> {
        debug!("🏦 Creating {} account(s) on license {license_id}", accounts.len());
        let path = format!("api/v2/manager/{license_id}/accounts");
        let data: Vec<AccountData> = self.rest_fetch(Method::POST, &path, Some(accounts)).await?;
        info!("🏦 Created accounts: {:?}", data.iter().map(|a| a.account.as_str()).collect::<Vec<_>>());
        Ok(data)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BrokerApiError> {
        debug!("🏦 Cancelling subscription {subscription_id}");
        let path = format!("api/v2/commerce/subscriptions/products/{subscription_id}");
        self.rest_query::<serde_json::Value, ()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn set_account_risk(
        &self,
        license_id: &str,
        account: &str,
        profile_id: &str,
    ) -> Result<(), BrokerApiError> {
        debug!("🏦 Applying risk profile {profile_id} to account {account}");
        let path = format!("api/v2/manager/{license_id}/accounts/{account}");
        let body = AccountRisk { profile_id: profile_id.to_string(), account_type: ACCOUNT_TYPE_CHALLENGE };
        self.rest_query::<serde_json::Value, _>(Method::POST, &path, Some(&body)).await?;
        Ok(())
    }

    async fn block_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError> {
        debug!("🏦 Blocking account {account} on license {license_id}");
        let path = format!("api/v2/manager/licenses/{license_id}/block/accounts/{account}");
        self.rest_query::<serde_json::Value, ()>(Method::PUT, &path, None).await?;
        Ok(())
    }

    async fn unblock_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError> {
        debug!("🏦 Unblocking account {account} on license {license_id}");
        let path = format!("api/v2/manager/licenses/{license_id}/block/accounts/{account}");
        self.rest_query::<serde_json::Value, ()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn remove_account(&self, license_id: &str, account: &str) -> Result<(), BrokerApiError> {
        debug!("🏦 Removing account {account} from license {license_id}");
        let path = format!("api/v2/manager/license/{license_id}/accounts/{account}");
        self.rest_query::<serde_json::Value, ()>(Method::DELETE, &path, None).await?;
        Ok(())
    }
}
