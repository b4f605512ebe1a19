use std::time::{Duration, Instant};

use embedded_hal::digital::{InputPin, PinState};
use embedded_timers::clock::Clock;

use super::error::EdgeError;
use crate::cancel::CancelToken;
use crate::line::LineError;

/// 把时长换算为微秒(饱和到u32)
pub fn as_micros(duration: Duration) -> u32 {
    duration.as_micros().min(u32::MAX as u128) as u32
}

/// 在指定时间范围内等待针脚变为目标电平
///
/// 忙等轮询，看到目标电平立即返回已等待的微秒数。
/// 超过`timeout_us`返回`Timeout`，读针脚失败返回`Line`，令牌被取消返回`Cancelled`。
pub fn wait_for_level<L, K>(
    line: &mut L,
    level: PinState,
    timeout_us: u32,
    clock: &K,
    cancel: &CancelToken,
) -> Result<u32, EdgeError>
where
    L: InputPin,
    K: Clock<Instant = Instant>,
{
    let target_high = level == PinState::High;
    let timeout = Duration::from_micros(timeout_us as u64);
    let start = clock.now();

    loop {
        let high = line.is_high().map_err(LineError::from_pin)?;
        let elapsed = clock.elapsed(start);
        if high == target_high {
            return Ok(as_micros(elapsed));
        }
        if elapsed > timeout {
            return Err(EdgeError::Timeout);
        }
        if cancel.is_cancelled() {
            return Err(EdgeError::Cancelled);
        }
    }
}
