mod access_control;
mod bounded_cache;
mod file_cache;
mod interception;
mod memoizing_lookup;
mod memory_cache;
mod timing;

pub use access_control::AccessControl;
pub use bounded_cache::BoundedCache;
pub use file_cache::FileCache;
pub use interception::{Call, Intercepted, Interceptor};
pub use memoizing_lookup::MemoizingLookupCache;
pub use memory_cache::MemoryCache;
pub use timing::TimingInterceptor;
