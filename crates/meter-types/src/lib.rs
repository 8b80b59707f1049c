//! Meter Types - Shared domain types
//!
//! This crate contains domain types used across Meterline crates and services:
//! - Tenant identity (organizations, API keys)
//! - Usage events and daily aggregates
//! - Pricing plans, invoices and fixed-point money

pub mod billing;
pub mod error;
pub mod ids;
pub mod money;
pub mod organization;
pub mod usage;

pub use billing::*;
pub use error::*;
pub use ids::*;
pub use money::*;
pub use organization::*;
pub use usage::*;
