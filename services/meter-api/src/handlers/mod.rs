//! REST API handlers

pub mod auth;
pub mod health;
pub mod invoices;
pub mod organization;
pub mod shared;
pub mod usage;

pub use auth::*;
pub use health::*;
pub use invoices::*;
pub use organization::*;
pub use usage::*;
