//! # Trader evaluation gateway server
//!
//! The HTTP face of the evaluation back office. It is responsible for:
//! * Receiving payment webhooks from the checkout platform, recording them
//!   idempotently, and mailing the trader their registration link.
//! * Serving the registration portal's API (validate a payment, check for an
//!   existing client, process a registration).
//! * The operator endpoints that drive evaluations: provision a funded
//!   account at the broker, start the evaluation clock, and close it out.
//!
//! ## Configuration
//! Everything is configured via `TEG_*` environment variables. See [config]
//! for the full list.
//!
//! ## Routes
//! * `GET /health` — liveness check.
//! * `POST /webhook/payment` — checkout webhook, guarded by a shared secret.
//! * `/registration/*` and `/api/*` — guarded by a Bearer API key.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod notify;
pub mod routes;
pub mod server;
pub mod webhook;
