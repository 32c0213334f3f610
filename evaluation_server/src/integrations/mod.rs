//! Outbound integrations driven by back-office actions.

pub mod broker;

pub use broker::BrokerService;
