mod audit;
mod cache;
mod provider;
mod stats;

pub use audit::{AuditAction, AuditEntry};
pub use cache::Cache;
pub use provider::{LookupError, Provider};
pub use stats::{BoundedCacheSnapshot, LookupStats};
