//! # Broker tools
//!
//! A client library for the broker's management REST API and realtime
//! WebSocket feed. [`BrokerApi`] wraps the REST surface (subscriptions,
//! trading accounts, risk profiles) behind an automatically refreshed
//! session token, and [`RealtimeSession`] maintains the long-lived event
//! socket used by dashboards.
//!
//! All REST responses arrive wrapped in the broker's standard envelope
//! (`isSuccess` / `status` / `message` / `data`). The envelope is unwrapped
//! here so callers only ever see the payload or a [`BrokerApiError`].

pub mod api;
pub mod config;
pub mod data_objects;
pub mod error;
pub mod profiles;
pub mod realtime;
mod session;

pub use api::{BrokerApi, BrokerClient};
pub use config::BrokerConfig;
pub use error::BrokerApiError;
pub use session::SessionToken;
