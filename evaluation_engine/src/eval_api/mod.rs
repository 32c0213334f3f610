//! The public engine APIs. [`PaymentFlowApi`] drives the payment →
//! registration pipeline; [`ClientApi`] backs the operator endpoints.

mod client_api;
mod payment_flow_api;

pub use client_api::ClientApi;
pub use payment_flow_api::PaymentFlowApi;
