//! 滑动窗口限流器
//!
//! 按客户端 ID 维度记录请求时间戳，每次检查时惰性剔除窗口外的条目。
//! 这是管线中唯一的共享可变状态；桶表用互斥锁保护，锁在任何 await
//! 之前释放，慢的上游调用不会占着锁。
//!
//! 不持久化，进程重启即清零 —— 保护的是上游调用成本，不是安全边界。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 窗口长度（秒）
    pub window_secs: u64,
    /// 窗口内最大放行请求数
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 20,
        }
    }
}

/// 单个客户端的请求时间戳桶
#[derive(Debug, Default)]
struct RateBucket {
    timestamps: Vec<Instant>,
}

/// 滑动窗口限流器
pub struct SlidingWindowRateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, RateBucket>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// 记录一次请求并检查是否放行（true = 放行）
    ///
    /// 先追加本次时间戳，再剔除过期条目，最后判断剩余数量是否仍在
    /// 上限内。被拒绝的请求也会计入桶中。
    pub fn admit(&self, client_id: &str) -> bool {
        self.admit_at(client_id, Instant::now())
    }

    fn admit_at(&self, client_id: &str, now: Instant) -> bool {
        let window = Duration::from_secs(self.config.window_secs);
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(client_id.to_string()).or_default();
        bucket.timestamps.push(now);
        bucket
            .timestamps
            .retain(|t| now.saturating_duration_since(*t) < window);
        bucket.timestamps.len() <= self.config.max_requests
    }

    /// 当前记录的客户端数量（观测用）
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}
