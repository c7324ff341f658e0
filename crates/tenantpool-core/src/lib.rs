//! Core types shared by the tenantpool client factory.
//!
//! Holds the serde-backed [`FactoryOptions`] document, the validated
//! [`ConnectionParams`] handed to session construction, and the
//! [`ConfigError`] raised when either is malformed.

pub mod config;
pub mod error;
pub mod params;

pub use config::FactoryOptions;
pub use error::{ConfigError, ConfigResult};
pub use params::{AuthMode, ConnectionParams};
