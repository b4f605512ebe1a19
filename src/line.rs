use std::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::digital::{InputPin, OutputPin};

/// 当前被占用的GPIO针脚(偏移量+1)，0表示没有针脚被占用
///
/// - 只在`LineGuard`创建和销毁时写入
/// - 看门狗等取消路径只读
static HELD_LINE: AtomicU32 = AtomicU32::new(0);

/// 查询当前被占用的GPIO针脚
pub fn held_line() -> Option<u8> {
    match HELD_LINE.load(Ordering::SeqCst) {
        0 => None,
        raw => Some((raw - 1) as u8),
    }
}

/// GPIO访问错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    /// 没有权限打开GPIO芯片或申请针脚
    #[error("GPIO access denied - try running with sudo ({0})")]
    PermissionDenied(String),
    /// 针脚不存在或已被占用
    #[error("Failed to get GPIO line {offset}: {reason}")]
    Unavailable { offset: u8, reason: String },
    /// 已申请的针脚读写失败
    #[error("GPIO line I/O error: {0}")]
    Io(String),
    /// 针脚已释放后仍被读写
    #[error("GPIO line already released")]
    Released,
}

impl LineError {
    /// 把`embedded-hal`的针脚错误转换为`LineError`
    pub fn from_pin<E: embedded_hal::digital::Error>(err: E) -> Self {
        Self::Io(format!("{:?}", err.kind()))
    }
}

/// 可在输入、输出模式之间切换的单个GPIO针脚
///
/// - `set_high`/`set_low`: 设置电平(输出模式)
/// - `is_high`/`is_low`: 读取电平(输入模式)
pub trait GpioLine: InputPin + OutputPin {
    /// 切换为输入模式，释放总线交给传感器驱动
    fn request_input(&mut self) -> Result<(), LineError>;

    /// 释放针脚(恢复输入模式并关闭芯片句柄)，重复调用无副作用
    fn release(&mut self);
}

/// GPIO芯片访问层
pub trait GpioBackend {
    type Line: GpioLine;

    /// 打开芯片、获取针脚并以输出模式(初始高电平)申请该针脚
    fn acquire(&mut self, offset: u8) -> Result<Self::Line, LineError>;
}

/// 针脚作用域守卫
///
/// 创建时登记到进程级的占用状态，销毁时先清除登记再释放针脚，
/// 任何提前返回的路径都会自动释放。
pub struct LineGuard<L: GpioLine> {
    line: L,
}

impl<L: GpioLine> LineGuard<L> {
    /// 通过`backend`申请针脚
    pub fn acquire<B>(backend: &mut B, offset: u8) -> Result<Self, LineError>
    where
        B: GpioBackend<Line = L>,
    {
        let line = backend.acquire(offset)?;
        HELD_LINE.store(offset as u32 + 1, Ordering::SeqCst);
        Ok(Self { line })
    }

    pub fn line(&mut self) -> &mut L {
        &mut self.line
    }
}

impl<L: GpioLine> Drop for LineGuard<L> {
    fn drop(&mut self) {
        HELD_LINE.store(0, Ordering::SeqCst);
        self.line.release();
    }
}
