use std::time::Duration;

/// DHT11重试间隔: 0.05s x2, 0.1s x3, 然后0.2, 0.4, 0.8, 1.6, 最后2s x3
const DHT11_DELAYS: [Duration; 12] = [
    Duration::from_millis(50),
    Duration::from_millis(50),
    Duration::from_millis(100),
    Duration::from_millis(100),
    Duration::from_millis(100),
    Duration::from_millis(200),
    Duration::from_millis(400),
    Duration::from_millis(800),
    Duration::from_millis(1600),
    Duration::from_millis(2000),
    Duration::from_millis(2000),
    Duration::from_millis(2000),
];

/// 固定的重试间隔序列，长度即最大重试次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: &'static [Duration],
}

impl RetrySchedule {
    /// DHT11使用的退避序列(12次重试，共13次尝试)
    pub const fn dht11() -> Self {
        Self {
            delays: &DHT11_DELAYS,
        }
    }

    /// 第`retry`次重试前的等待时间(从0开始)，用完返回`None`
    pub fn delay(&self, retry: usize) -> Option<Duration> {
        self.delays.get(retry).copied()
    }

    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// 所有重试等待时间之和
    pub fn total(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::dht11()
    }
}
