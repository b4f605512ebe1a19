use std::fmt::Debug;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin, PinState};
use rppal::gpio::{Gpio, IoPin, Mode};

use crate::line::{GpioBackend, GpioLine, LineError};

#[derive(Debug, Clone, Copy)]
pub enum IoPinWapperError {
    /// 针脚已释放
    Released,
}

impl Error for IoPinWapperError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Released => ErrorKind::Other,
        }
    }
}

impl std::fmt::Display for IoPinWapperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl std::error::Error for IoPinWapperError {}

/// 基于rppal的I/O Pin Wapper
///
/// 同时持有GPIO芯片句柄，`release`后两者都被关闭。
pub struct IoPinWapper {
    /// 针脚，`None`表示已释放
    pin: Option<IoPin>,
    /// 芯片句柄
    gpio: Option<Gpio>,
    mode: Mode,
}

impl ErrorType for IoPinWapper {
    type Error = IoPinWapperError;
}

impl IoPinWapper {
    pub fn new(gpio: Gpio, pin: IoPin) -> Self {
        let mode = pin.mode();
        Self {
            pin: Some(pin),
            gpio: Some(gpio),
            mode,
        }
    }

    /// 切换模式(已处于目标模式则跳过)
    fn pin_in(&mut self, mode: Mode) -> Result<&mut IoPin, IoPinWapperError> {
        let pin = self.pin.as_mut().ok_or(IoPinWapperError::Released)?;
        if self.mode != mode {
            pin.set_mode(mode);
            self.mode = mode;
        }
        Ok(pin)
    }
}

impl InputPin for IoPinWapper {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(IoPin::is_high(self.pin_in(Mode::Input)?))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(IoPin::is_low(self.pin_in(Mode::Input)?))
    }
}

impl OutputPin for IoPinWapper {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        IoPin::set_high(self.pin_in(Mode::Output)?);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        IoPin::set_low(self.pin_in(Mode::Output)?);
        Ok(())
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        let pin = self.pin_in(Mode::Output)?;
        match state {
            PinState::High => IoPin::set_high(pin),
            PinState::Low => IoPin::set_low(pin),
        }
        Ok(())
    }
}

impl GpioLine for IoPinWapper {
    fn request_input(&mut self) -> Result<(), LineError> {
        self.pin_in(Mode::Input).map_err(|_| LineError::Released)?;
        Ok(())
    }

    fn release(&mut self) {
        // IoPin销毁时会恢复针脚原来的模式
        if let Some(mut pin) = self.pin.take() {
            pin.set_mode(Mode::Input);
        }
        self.gpio = None;
    }
}

/// 树莓派GPIO访问层(rppal)
#[derive(Debug, Default)]
pub struct RppalBackend;

impl RppalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl GpioBackend for RppalBackend {
    type Line = IoPinWapper;

    fn acquire(&mut self, offset: u8) -> Result<Self::Line, LineError> {
        // 打开GPIO芯片
        let gpio = Gpio::new().map_err(|err| match err {
            rppal::gpio::Error::PermissionDenied(path) => LineError::PermissionDenied(path),
            other => LineError::Io(other.to_string()),
        })?;
        // 获取针脚
        let pin = gpio.get(offset).map_err(|err| match err {
            rppal::gpio::Error::PermissionDenied(path) => LineError::PermissionDenied(path),
            other => LineError::Unavailable {
                offset,
                reason: other.to_string(),
            },
        })?;
        // 以输出模式申请，初始高电平
        let mut pin = pin.into_io(Mode::Output);
        IoPin::set_high(&mut pin);
        Ok(IoPinWapper::new(gpio, pin))
    }
}
