use chrono::{DateTime, Duration, Utc};

use crate::data_objects::AuthData;

/// How long before its stated expiry a token is treated as stale. Refreshing
/// early avoids racing the broker's clock on long-running calls.
const EXPIRY_MARGIN_MINS: i64 = 5;

/// A bearer token issued by the broker's login endpoint, together with its
/// expiry timestamp.
#[derive(Debug, Clone)]
pub struct SessionToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is usable if it has more than [`EXPIRY_MARGIN_MINS`] minutes of
    /// life left.
    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now() + Duration::minutes(EXPIRY_MARGIN_MINS)
    }
}

impl From<AuthData> for SessionToken {
    fn from(auth: AuthData) -> Self {
        Self::new(auth.token, auth.expires_at)
    }
}
