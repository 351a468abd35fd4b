//! edudash: data layer of the e-learning admin dashboard.
//!
//! The [`cache::QueryClient`] owns a shared response cache over a registry of
//! declared endpoints ([`cache::Api`]); [`api`] declares the backend surface
//! and [`transport`] carries requests to it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod transport;

pub use edudash_api_types as types;
