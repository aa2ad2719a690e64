//! Resilient HTTP execution with proxy rotation

pub mod proxy_pool;
pub mod resilient;

pub use proxy_pool::ProxyPool;
pub use resilient::{RequestOptions, ResilientClient};
