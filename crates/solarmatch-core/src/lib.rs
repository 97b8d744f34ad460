//! SolarMatch Core - Domain models, pricing tables and the financial engine
//!
//! This crate contains the pure domain logic shared by the acquisition,
//! report and CLI crates. Nothing in here performs I/O except configuration
//! loading.

pub mod config;
pub mod error;
pub mod finance;
pub mod models;
pub mod pricing;

pub use error::{Result, SolarError};
pub use finance::derive_financials;
pub use pricing::PricingConfig;
