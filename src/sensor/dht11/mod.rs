//! DHT11 温度、湿度二合一传感器
//!
//! 单总线协议完全由软件控制GPIO时序实现(bit-banging)，DHT11时序很不稳定，
//! 所以读取时会提升调度优先级，失败后按固定间隔重试，全部失败再由调用方退回到缓存。

pub mod cache;
pub mod capture;
pub mod decode;
pub mod edge;
pub mod error;
pub mod reading;
pub mod retry;

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use tracing::{debug, error, info, warn};

pub use cache::{CACHE_DIR, CACHE_MAX_AGE, CachedReading, RunDirCache};
pub use capture::{FrameCapturer, FrameSource, PulseCapture};
pub use decode::{RawFrame, decode};
pub use error::{AttemptError, CaptureError, DecodeError, EdgeError, NoCache};
pub use reading::SensorReading;
pub use retry::RetrySchedule;

use crate::cancel::CancelToken;
use crate::io_pin_wapper::RppalBackend;
use crate::sched::{DEFAULT_REALTIME_PRIORITY, RealtimeGuard};
use crate::std_clock::{StdClock, StdDelay};

/// 重试等待期间检查取消令牌的间隔
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// 读取流程的可选项
#[derive(Debug, Clone)]
pub struct Dht11Options {
    /// 读取期间使用的SCHED_FIFO优先级，`None`表示不提升
    pub realtime_priority: Option<i32>,
    /// 取消令牌(信号、看门狗)
    pub cancel: CancelToken,
}

impl Default for Dht11Options {
    fn default() -> Self {
        Self {
            realtime_priority: Some(DEFAULT_REALTIME_PRIORITY),
            cancel: CancelToken::new(),
        }
    }
}

/// 树莓派上的默认采集器
pub type RppalCapturer = FrameCapturer<RppalBackend, StdDelay, StdClock>;

/// DHT11 读取流程
///
/// 每次`read`都会重新申请针脚，读取结束(包括失败)后立即释放。
pub struct DHT11<S = RppalCapturer, D = StdDelay> {
    source: S,
    delay: D,
    options: Dht11Options,
}

impl DHT11 {
    /// 使用rppal访问树莓派GPIO
    pub fn new() -> Self {
        Self::with_options(Dht11Options::default())
    }

    pub fn with_options(options: Dht11Options) -> Self {
        let capturer = FrameCapturer::new(RppalBackend::new(), StdDelay::new(), StdClock::new());
        Self::with_source(capturer, StdDelay::new(), options)
    }
}

impl Default for DHT11 {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, D> DHT11<S, D>
where
    S: FrameSource,
    D: DelayNs,
{
    /// 使用自定义的脉冲来源和重试延时
    pub fn with_source(source: S, delay: D, options: Dht11Options) -> Self {
        Self {
            source,
            delay,
            options,
        }
    }

    pub fn options(&self) -> &Dht11Options {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 从`pin`读取温度和湿度
    ///
    /// 不会返回错误，失败信息都记录在`SensorReading`里。
    /// 权限类错误不重试；读取被取消时立即结束。
    pub fn read(&mut self, pin: u8) -> SensorReading {
        // 守卫销毁时恢复普通调度
        let _realtime = RealtimeGuard::elevate(self.options.realtime_priority);
        let schedule = RetrySchedule::dht11();
        let cancel = self.options.cancel.clone();

        let mut attempts: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Self::cancelled(attempts);
            }

            attempts += 1;
            match self.attempt(pin, &cancel) {
                Ok(frame) => {
                    if attempts > 1 {
                        info!("GPIO{}第{}次尝试读取成功", pin, attempts);
                    }
                    return SensorReading::ok(frame.temperature(), frame.humidity())
                        .with_attempts(attempts);
                }
                Err(AttemptError::Capture(err)) if err.is_access() => {
                    // 权限问题重试也没用
                    error!("GPIO{}无法访问: {}", pin, err);
                    return SensorReading::failed(err.to_string()).with_attempts(attempts);
                }
                Err(AttemptError::Capture(CaptureError::Cancelled)) => {
                    return Self::cancelled(attempts);
                }
                Err(err) => {
                    debug!("GPIO{}第{}次尝试失败: {}", pin, attempts, err);
                }
            }

            let Some(delay) = schedule.delay(attempts as usize - 1) else {
                break;
            };
            if !self.sleep(delay, &cancel) {
                return Self::cancelled(attempts);
            }
        }

        warn!("GPIO{}读取失败，共尝试{}次", pin, attempts);
        SensorReading::failed(format!("Failed to read DHT11 after {} attempts", attempts))
            .with_attempts(attempts)
    }

    /// 一次完整的采集+解码
    fn attempt(&mut self, pin: u8, cancel: &CancelToken) -> Result<RawFrame, AttemptError> {
        let capture = self.source.capture(pin, cancel)?;
        Ok(decode(&capture)?)
    }

    /// 分片等待，期间被取消返回false
    fn sleep(&mut self, duration: Duration, cancel: &CancelToken) -> bool {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                return false;
            }
            let slice = remaining.min(SLEEP_SLICE);
            self.delay.delay_us(slice.as_micros() as u32);
            remaining -= slice;
        }
        !cancel.is_cancelled()
    }

    fn cancelled(attempts: u32) -> SensorReading {
        warn!("读取被取消，已尝试{}次", attempts);
        SensorReading::failed(CaptureError::Cancelled.to_string()).with_attempts(attempts)
    }
}
