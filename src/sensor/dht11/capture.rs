use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use embedded_timers::clock::Clock;
use tracing::debug;

use super::edge::{as_micros, wait_for_level};
use super::error::{CaptureError, EdgeError};
use crate::cancel::CancelToken;
use crate::line::{GpioBackend, GpioLine, LineError, LineGuard};

/// 一次采集最多记录的脉冲数
pub const PULSE_CAPACITY: usize = 50;
/// 高电平超过该时长(微秒)视为数据帧结束
pub const END_OF_FRAME_US: u32 = 500;
/// 等待电平变化的超时时间(微秒)
pub const EDGE_TIMEOUT_US: u32 = 1000;
/// 开始信号: 拉低20ms(手册要求至少18ms)
pub const START_LOW_MS: u32 = 20;
/// 开始信号: 再拉高20us(手册要求20~40us)
pub const START_HIGH_US: u32 = 20;

/// 一次采集到的高电平脉冲宽度(微秒)，最多50个
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PulseCapture {
    pulses: Vec<u32>,
    /// 结束标记(超过500us的高电平)，不计入数据脉冲
    end_marker: Option<u32>,
}

impl PulseCapture {
    pub fn new() -> Self {
        Self {
            pulses: Vec::with_capacity(PULSE_CAPACITY),
            end_marker: None,
        }
    }

    /// 由已有的脉冲序列构建，超出容量的部分被丢弃
    pub fn from_pulses<I: IntoIterator<Item = u32>>(pulses: I) -> Self {
        let mut capture = Self::new();
        for pulse in pulses {
            if !capture.push(pulse) {
                break;
            }
        }
        capture
    }

    /// 追加一个脉冲，已满返回false
    pub fn push(&mut self, pulse_us: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.pulses.push(pulse_us);
        true
    }

    pub fn pulses(&self) -> &[u32] {
        &self.pulses
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pulses.len() >= PULSE_CAPACITY
    }

    pub fn end_marker(&self) -> Option<u32> {
        self.end_marker
    }

    pub fn set_end_marker(&mut self, pulse_us: u32) {
        self.end_marker = Some(pulse_us);
    }
}

/// 脉冲来源，由读取流程调用
pub trait FrameSource {
    /// 完成一次开始信号+握手+数据脉冲采集
    fn capture(&mut self, pin: u8, cancel: &CancelToken) -> Result<PulseCapture, CaptureError>;
}

/// 通过GPIO单总线采集DHT11数据脉冲
pub struct FrameCapturer<B, D, K> {
    backend: B,
    delay: D,
    clock: K,
}

impl<B, D, K> FrameCapturer<B, D, K>
where
    B: GpioBackend,
    D: DelayNs,
    K: Clock<Instant = Instant>,
{
    pub fn new(backend: B, delay: D, clock: K) -> Self {
        Self {
            backend,
            delay,
            clock,
        }
    }

    /// 握手阶段等待电平，超时即本次采集失败
    fn expect(
        line: &mut B::Line,
        level: PinState,
        stage: &'static str,
        clock: &K,
        cancel: &CancelToken,
    ) -> Result<(), CaptureError> {
        wait_for_level(line, level, EDGE_TIMEOUT_US, clock, cancel)
            .map(|_| ())
            .map_err(|err| match err {
                EdgeError::Timeout => CaptureError::Timeout(stage),
                other => other.into(),
            })
    }
}

impl From<EdgeError> for CaptureError {
    fn from(err: EdgeError) -> Self {
        match err {
            EdgeError::Timeout => CaptureError::Timeout("edge"),
            EdgeError::Line(err) => CaptureError::Line(err),
            EdgeError::Cancelled => CaptureError::Cancelled,
        }
    }
}

impl<B, D, K> FrameSource for FrameCapturer<B, D, K>
where
    B: GpioBackend,
    D: DelayNs,
    K: Clock<Instant = Instant>,
{
    fn capture(&mut self, pin: u8, cancel: &CancelToken) -> Result<PulseCapture, CaptureError> {
        // 守卫离开作用域时释放针脚和芯片句柄
        let mut guard = LineGuard::acquire(&mut self.backend, pin)?;
        let line = guard.line();
        let clock = &self.clock;

        // 发送开始信号（告诉传感器，我要读取数据了）
        line.set_low().map_err(LineError::from_pin)?;
        self.delay.delay_ms(START_LOW_MS);
        line.set_high().map_err(LineError::from_pin)?;
        self.delay.delay_us(START_HIGH_US);

        // 设置引脚为输入模式
        line.request_input()?;

        // 传感器响应: 低电平约80us，高电平约80us，然后拉低开始第一位
        Self::expect(line, PinState::Low, "response low", clock, cancel)?;
        Self::expect(line, PinState::High, "response high", clock, cancel)?;
        Self::expect(line, PinState::Low, "data start", clock, cancel)?;

        // 每一位: 低电平约50us，然后高电平26~28us(0)或70us(1)
        let mut capture = PulseCapture::new();
        for _ in 0..PULSE_CAPACITY {
            match wait_for_level(line, PinState::High, EDGE_TIMEOUT_US, clock, cancel) {
                Ok(_) => {}
                // 没有更多数据位
                Err(EdgeError::Timeout) => break,
                Err(err) => return Err(err.into()),
            }

            // 测量高电平持续时间
            let start = clock.now();
            match wait_for_level(line, PinState::Low, EDGE_TIMEOUT_US, clock, cancel) {
                Ok(_) | Err(EdgeError::Timeout) => {}
                Err(err) => return Err(err.into()),
            }
            let duration = as_micros(clock.elapsed(start));

            // 总线一直保持高电平，数据已结束
            if duration > END_OF_FRAME_US {
                capture.set_end_marker(duration);
                break;
            }
            capture.push(duration);
        }

        debug!(
            "GPIO{}采集到{}个脉冲，结束标记: {:?}",
            pin,
            capture.len(),
            capture.end_marker()
        );
        Ok(capture)
    }
}
