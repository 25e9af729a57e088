//! Stateless HTTP proxy in front of the external face-detection
//! service.
//!
//! The proxy holds the service credential, validates image payloads
//! locally, forwards detection calls, and normalizes upstream failures
//! into one error envelope. It keeps no state between requests beyond
//! process-lifetime configuration.

pub mod config;
pub mod routes;
pub mod server;
pub mod upstream;
