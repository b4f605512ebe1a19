use embedded_hal::delay::DelayNs;
use embedded_timers::clock::Clock;
use std::time::{Duration, Instant};

/// 基于`std::time::Instant`的单调时钟，用于测量微秒级脉冲宽度
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock {}

impl StdClock {
    pub fn new() -> Self {
        Self {}
    }
}

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, instant: Self::Instant) -> Duration {
        instant.elapsed()
    }
}

/// 短于该时长的等待使用忙等
const SPIN_LIMIT: Duration = Duration::from_micros(100);

/// 标准库延时
///
/// 微秒级等待不能使用`std::thread::sleep`，线程被挂起后唤醒时间不可控，
/// DHT11的时序就会错乱，因此短延时采用忙等，长延时才让出CPU。
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay {}

impl StdDelay {
    pub fn new() -> Self {
        Self {}
    }

    /// 忙等
    fn spin(duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {}
    }
}

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        let duration = Duration::from_nanos(ns as u64);
        if duration < SPIN_LIMIT {
            Self::spin(duration);
        } else {
            std::thread::sleep(duration);
        }
    }
}
