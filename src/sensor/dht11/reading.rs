/// 错误信息最大字节数
pub const MAX_ERROR_LEN: usize = 127;

/// 交给调用方的读数
///
/// 要么有效(带温度、湿度)，要么无效(带错误信息)，不会两者都有或都没有。
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    temperature: f32,
    humidity: f32,
    valid: bool,
    error_message: Option<String>,
    attempts: u32,
}

impl SensorReading {
    /// 有效读数
    pub fn ok(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
            valid: true,
            error_message: None,
            attempts: 0,
        }
    }

    /// 无效读数，错误信息超长时按字符边界截断
    pub fn failed(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.len() > MAX_ERROR_LEN {
            let mut end = MAX_ERROR_LEN;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        Self {
            temperature: 0.0,
            humidity: 0.0,
            valid: false,
            error_message: Some(message),
            attempts: 0,
        }
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// 温度(℃)，无效读数为0
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// 相对湿度(%)，无效读数为0
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// 实际尝试次数，缓存读数为0
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
