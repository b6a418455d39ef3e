//! 准入控制

pub mod rate_limiter;

pub use rate_limiter::{RateLimitConfig, SlidingWindowRateLimiter};
