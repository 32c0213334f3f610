//! # Evaluation engine
//!
//! The domain core of the trader evaluation gateway. It owns:
//!
//! * The data model: payments arriving from the checkout platform, clients
//!   moving through the evaluation state machine, and the outreach contact
//!   log ([`db_types`]).
//! * The persistence seams: [`traits::PaymentStore`], [`traits::ClientStore`]
//!   and [`traits::ContactLog`], so the server is generic over the backend.
//! * The SQLite implementation of those traits ([`sqlite`]).
//! * The engine APIs the server composes: [`eval_api::PaymentFlowApi`] for
//!   the payment → registration pipeline and [`eval_api::ClientApi`] for
//!   operator-facing client management.
//!
//! The evaluation state machine is deliberately small: a client starts in
//! `Aguardando Inicio`, moves to `Em Curso` when their funded account goes
//! live, and ends in exactly one of `Aprovado` or `Reprovado`. All status
//! writes go through transition checks; there is no path out of a terminal
//! state.

pub mod db_types;
pub mod eval_api;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteDatabase;
