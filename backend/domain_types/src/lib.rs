pub mod action;
pub mod authentication;
pub mod configuration;
pub mod errors;
pub mod payment;
