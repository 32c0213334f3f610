use std::env;

use broker_tools::BrokerConfig;
use log::*;
use teg_common::Secret;

const DEFAULT_TEG_HOST: &str = "127.0.0.1";
const DEFAULT_TEG_PORT: u16 = 8360;
const DEFAULT_PORTAL_URL: &str = "https://portal.example.com";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret the checkout platform sends in the `x-webhook-token`
    /// header.
    pub webhook_secret: Secret<String>,
    /// Bearer key for the registration portal and operator endpoints.
    pub api_key: Secret<String>,
    /// Base URL of the registration portal, used to build the link mailed to
    /// traders.
    pub registration_base_url: String,
    pub email: EmailConfig,
    pub broker: BrokerConfig,
}

#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub sender: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TEG_HOST.to_string(),
            port: DEFAULT_TEG_PORT,
            database_url: String::default(),
            webhook_secret: Secret::default(),
            api_key: Secret::default(),
            registration_base_url: DEFAULT_PORTAL_URL.to_string(),
            email: EmailConfig::default(),
            broker: BrokerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TEG_HOST").ok().unwrap_or_else(|| DEFAULT_TEG_HOST.into());
        let port = env::var("TEG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TEG_PORT. {e} Using the default, {DEFAULT_TEG_PORT}, instead."
                    );
                    DEFAULT_TEG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TEG_PORT);
        let database_url = env::var("TEG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TEG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let webhook_secret = Secret::new(env::var("TEG_WEBHOOK_SECRET").unwrap_or_else(|_| {
            error!("🪛️ TEG_WEBHOOK_SECRET is not set. All webhook deliveries will be rejected.");
            String::default()
        }));
        let api_key = Secret::new(env::var("TEG_API_KEY").unwrap_or_else(|_| {
            error!("🪛️ TEG_API_KEY is not set. All portal and operator calls will be rejected.");
            String::default()
        }));
        let registration_base_url = env::var("TEG_PORTAL_URL").unwrap_or_else(|_| {
            warn!("🪛️ TEG_PORTAL_URL is not set. Registration links will use {DEFAULT_PORTAL_URL}.");
            DEFAULT_PORTAL_URL.to_string()
        });
        let email = EmailConfig::from_env_or_default();
        let broker = BrokerConfig::new_from_env_or_default();
        Self { host, port, database_url, webhook_secret, api_key, registration_base_url, email, broker }
    }
}

impl EmailConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = env::var("TEG_EMAIL_API_URL").unwrap_or_else(|_| {
            warn!("🪛️ TEG_EMAIL_API_URL is not set. Registration emails will fail.");
            String::default()
        });
        let api_key = Secret::new(env::var("TEG_EMAIL_API_KEY").unwrap_or_default());
        let sender = env::var("TEG_EMAIL_FROM").unwrap_or_else(|_| "no-reply@example.com".to_string());
        Self { api_url, api_key, sender }
    }
}
