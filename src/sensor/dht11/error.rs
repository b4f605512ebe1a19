use crate::line::LineError;

/// 等待电平变化失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    /// 超时未等到目标电平(DHT11常见现象)
    #[error("timed out waiting for edge")]
    Timeout,
    /// 读取针脚本身出错
    #[error(transparent)]
    Line(#[from] LineError),
    /// 被取消(信号或看门狗)
    #[error("cancelled")]
    Cancelled,
}

/// 单次采集失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// 无法打开、申请或读写针脚
    #[error(transparent)]
    Line(#[from] LineError),
    /// 握手阶段超时
    #[error("no response from sensor ({0})")]
    Timeout(&'static str),
    /// 被取消(信号或看门狗)
    #[error("read cancelled")]
    Cancelled,
}

impl CaptureError {
    /// 是否为访问类错误(重试也无法解决)
    pub fn is_access(&self) -> bool {
        matches!(self, Self::Line(_))
    }
}

/// 脉冲解码失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 有效脉冲不足38个
    #[error("insufficient pulses: {valid} valid, need at least {required}")]
    InsufficientPulses { valid: usize, required: usize },
    /// 校验和不一致
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// 没有可用的缓存数据
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NoCache {
    /// 缺少字段文件
    #[error("cached {0} missing")]
    Missing(&'static str),
    /// 字段内容无法解析
    #[error("cached {0} unparsable")]
    Unparsable(&'static str),
    /// 数据已过期
    #[error("cached reading is stale ({age_secs}s old)")]
    Stale { age_secs: u64 },
}

/// 单次尝试(采集+解码)失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
