//! Meter DB - Storage abstractions
//!
//! SQLx-based storage layer for Meterline services, plus an in-process
//! backend with the same repository traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use meter_db::{create_pool, run_migrations, Storage};
//!
//! let pool = create_pool("postgres://localhost/meterline").await?;
//! run_migrations(&pool).await?;
//! let storage = Storage::postgres(pool);
//!
//! let plans = storage.plans.find_by_org(org_id).await?;
//! ```

pub mod error;
pub mod hash;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;
pub mod storage;

pub use error::{DbError, DbResult};
pub use hash::hash_api_key;
pub use memory::MemoryStore;
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;
pub use storage::Storage;
