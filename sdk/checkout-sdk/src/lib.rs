//! Client side core of a checkout integration.
//!
//! Resolves the actions a payment session answers with, continues 3DS2 authentication through a
//! host supplied authenticator and reports progress, errors and the final outcome through
//! observables. Transport and UI stay with the host behind [`connector::PaymentConnector`] and
//! [`authenticator::ThreeDs2Authenticator`].

pub mod authenticator;
pub mod configs;
pub mod connector;
pub mod continuation;
pub mod delivery;
pub mod error;
pub mod handler;
pub mod logger;
pub mod observable;

pub use handler::{PaymentHandler, PaymentHandlerBuilder};
