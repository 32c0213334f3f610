use log::*;
use teg_common::Secret;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub api_url: String,
    pub username: String,
    pub password: Secret<String>,
    pub environment_id: String,
    pub timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api-broker.example.com".to_string(),
            username: String::default(),
            password: Secret::default(),
            environment_id: String::default(),
            timeout_secs: 30,
        }
    }
}

impl BrokerConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("TEG_BROKER_URL").unwrap_or_else(|_| {
            warn!("TEG_BROKER_URL not set, using (probably useless) default");
            "https://api-broker.example.com".to_string()
        });
        let username = std::env::var("TEG_BROKER_USERNAME").unwrap_or_else(|_| {
            warn!("TEG_BROKER_USERNAME not set, broker logins will fail");
            String::default()
        });
        let password = Secret::new(std::env::var("TEG_BROKER_PASSWORD").unwrap_or_else(|_| {
            warn!("TEG_BROKER_PASSWORD not set, broker logins will fail");
            String::default()
        }));
        let environment_id = std::env::var("TEG_BROKER_ENV_ID").unwrap_or_else(|_| {
            warn!("TEG_BROKER_ENV_ID not set, risk profile lookups will fail");
            String::default()
        });
        let timeout_secs = std::env::var("TEG_BROKER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        Self { api_url, username, password, environment_id, timeout_secs }
    }
}
