#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use embedded_timers::clock::Clock;

use sensor_dht11::cancel::CancelToken;
use sensor_dht11::line::{GpioBackend, GpioLine, LineError, held_line};
use sensor_dht11::sensor::dht11::{CaptureError, FrameSource, PulseCapture};

/// 占用状态是进程级的，用到针脚的测试串行执行
static HARDWARE: Mutex<()> = Mutex::new(());

pub fn hardware_lock() -> MutexGuard<'static, ()> {
    HARDWARE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 模拟时间(纳秒)，时钟、延时和针脚共享
pub type SimTime = Rc<Cell<u64>>;

/// 每次读时钟前进一个tick，模拟轮询消耗的时间
pub struct FakeClock {
    base: Instant,
    time: SimTime,
    tick_ns: u64,
}

impl FakeClock {
    pub fn new(time: SimTime) -> Self {
        Self {
            base: Instant::now(),
            time,
            tick_ns: 500,
        }
    }
}

impl Clock for FakeClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        let t = self.time.get();
        self.time.set(t + self.tick_ns);
        self.base + Duration::from_nanos(t)
    }

    fn elapsed(&self, instant: Self::Instant) -> Duration {
        self.now() - instant
    }
}

/// 推进模拟时间并记录总等待时长
#[derive(Clone, Default)]
pub struct FakeDelay {
    time: SimTime,
    pub total_ns: Rc<Cell<u64>>,
}

impl FakeDelay {
    pub fn new(time: SimTime) -> Self {
        Self {
            time,
            total_ns: Rc::new(Cell::new(0)),
        }
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns.get())
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.time.set(self.time.get() + ns as u64);
        self.total_ns.set(self.total_ns.get() + ns as u64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FakeError {
    Released,
    Broken,
}

impl embedded_hal::digital::Error for FakeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// 电平片段: (是否高电平, 持续微秒)
pub type Waveform = Vec<(bool, u64)>;

/// DHT11对开始信号的完整响应波形，结束后总线被上拉为高电平
pub fn dht11_waveform(bytes: [u8; 5]) -> Waveform {
    let mut wave = vec![(true, 30), (false, 80), (true, 80)];
    for byte in bytes {
        for bit in (0..8).rev() {
            let one = (byte >> bit) & 1 == 1;
            wave.push((false, 50));
            wave.push((true, if one { 70 } else { 26 }));
        }
    }
    wave.push((false, 50));
    wave
}

/// 切换为输入模式后按波形回放电平
pub struct ScriptedLine {
    time: SimTime,
    waveform: Rc<Waveform>,
    output_high: bool,
    input_since: Option<u64>,
    released: Rc<Cell<u32>>,
    is_released: bool,
    broken: bool,
    cancel_on_input: Option<CancelToken>,
    held_on_input: Rc<Cell<Option<u8>>>,
}

impl ScriptedLine {
    pub fn level_at(&self, now_ns: u64) -> bool {
        let Some(since) = self.input_since else {
            return self.output_high;
        };
        let mut offset = now_ns.saturating_sub(since);
        for &(high, us) in self.waveform.iter() {
            let len = us * 1000;
            if offset < len {
                return high;
            }
            offset -= len;
        }
        true
    }
}

impl ErrorType for ScriptedLine {
    type Error = FakeError;
}

impl InputPin for ScriptedLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.is_released {
            return Err(FakeError::Released);
        }
        if self.broken {
            return Err(FakeError::Broken);
        }
        Ok(self.level_at(self.time.get()))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for ScriptedLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.is_released {
            return Err(FakeError::Released);
        }
        self.output_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.is_released {
            return Err(FakeError::Released);
        }
        self.output_high = true;
        Ok(())
    }
}

impl GpioLine for ScriptedLine {
    fn request_input(&mut self) -> Result<(), LineError> {
        if self.is_released {
            return Err(LineError::Released);
        }
        self.input_since = Some(self.time.get());
        self.held_on_input.set(held_line());
        if let Some(cancel) = &self.cancel_on_input {
            cancel.cancel();
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.is_released {
            self.is_released = true;
            self.released.set(self.released.get() + 1);
        }
    }
}

/// 模拟的GPIO芯片
pub struct FakeBackend {
    time: SimTime,
    waveform: Rc<Waveform>,
    deny: Option<LineError>,
    broken: bool,
    cancel_on_input: Option<CancelToken>,
    pub acquired: Rc<Cell<u32>>,
    pub released: Rc<Cell<u32>>,
    /// 切换为输入模式时看到的占用状态
    pub held_on_input: Rc<Cell<Option<u8>>>,
}

impl FakeBackend {
    pub fn new(time: SimTime, waveform: Waveform) -> Self {
        Self {
            time,
            waveform: Rc::new(waveform),
            deny: None,
            broken: false,
            cancel_on_input: None,
            acquired: Rc::new(Cell::new(0)),
            released: Rc::new(Cell::new(0)),
            held_on_input: Rc::new(Cell::new(None)),
        }
    }

    /// 申请针脚总是失败
    pub fn denying(mut self, err: LineError) -> Self {
        self.deny = Some(err);
        self
    }

    /// 申请成功但读电平失败
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// 开始信号发完、切换为输入模式时取消令牌，模拟握手中途收到信号
    pub fn cancelling_on_input(mut self, cancel: CancelToken) -> Self {
        self.cancel_on_input = Some(cancel);
        self
    }
}

impl GpioBackend for FakeBackend {
    type Line = ScriptedLine;

    fn acquire(&mut self, _offset: u8) -> Result<Self::Line, LineError> {
        if let Some(err) = &self.deny {
            return Err(err.clone());
        }
        self.acquired.set(self.acquired.get() + 1);
        Ok(ScriptedLine {
            time: Rc::clone(&self.time),
            waveform: Rc::clone(&self.waveform),
            output_high: true,
            input_since: None,
            released: Rc::clone(&self.released),
            is_released: false,
            broken: self.broken,
            cancel_on_input: self.cancel_on_input.clone(),
            held_on_input: Rc::clone(&self.held_on_input),
        })
    }
}

/// 按顺序返回预设结果的脉冲来源，用完后重复最后一个
pub struct StubSource {
    results: VecDeque<Result<PulseCapture, CaptureError>>,
    last: Result<PulseCapture, CaptureError>,
    pub calls: u32,
}

impl StubSource {
    pub fn always(result: Result<PulseCapture, CaptureError>) -> Self {
        Self::sequence(vec![], result)
    }

    pub fn sequence(
        results: Vec<Result<PulseCapture, CaptureError>>,
        last: Result<PulseCapture, CaptureError>,
    ) -> Self {
        Self {
            results: results.into(),
            last,
            calls: 0,
        }
    }
}

impl FrameSource for StubSource {
    fn capture(&mut self, _pin: u8, _cancel: &CancelToken) -> Result<PulseCapture, CaptureError> {
        self.calls += 1;
        self.results
            .pop_front()
            .unwrap_or_else(|| self.last.clone())
    }
}

/// 把5个字节编码为脉冲宽度
pub fn pulses_for(bytes: [u8; 5]) -> PulseCapture {
    PulseCapture::from_pulses(bytes.iter().flat_map(|byte| {
        (0..8)
            .rev()
            .map(move |bit| if (byte >> bit) & 1 == 1 { 70 } else { 27 })
    }))
}
