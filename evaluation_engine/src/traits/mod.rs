//! The persistence seams of the engine.
//!
//! The server is generic over these traits, so endpoint and service tests run
//! against mocks while production uses [`crate::SqliteDatabase`], which
//! implements all three.

mod client_store;
mod payment_store;

pub use client_store::{ClientStore, ClientStoreError, ContactLog, ContactLogError};
pub use payment_store::{PaymentStore, PaymentStoreError};

/// Umbrella bound for handlers that need the whole store surface. Anything
/// that implements the three storage traits gets it for free.
pub trait EvaluationDatabase: PaymentStore + ClientStore + ContactLog {}

impl<T> EvaluationDatabase for T where T: PaymentStore + ClientStore + ContactLog {}
