use super::capture::{END_OF_FRAME_US, PulseCapture};
use super::error::DecodeError;

/// 一帧数据的位数
pub const FRAME_BITS: usize = 40;
/// 最少有效脉冲数，DHT11经常丢失1~2个边沿
pub const MIN_VALID_PULSES: usize = 38;

/// DHT11一帧原始数据
///
/// 8bit湿度整数 + 8bit湿度小数 + 8bit温度整数 + 8bit温度小数 + 8bit校验和
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    bytes: [u8; 5],
}

impl RawFrame {
    pub fn bytes(&self) -> [u8; 5] {
        self.bytes
    }

    /// 校验和=湿度整数+湿度小数+温度整数+温度小数(取低8位)
    pub fn checksum(data: &[u8]) -> u8 {
        data.iter().fold(0u8, |sum, v| sum.wrapping_add(*v))
    }

    /// 相对湿度(%)，DHT11的小数部分总是0
    pub fn humidity(&self) -> f32 {
        self.bytes[0] as f32 + self.bytes[1] as f32 / 10.0
    }

    /// 温度(℃)
    pub fn temperature(&self) -> f32 {
        self.bytes[2] as f32 + self.bytes[3] as f32 / 10.0
    }
}

/// 把脉冲宽度解码为5个字节并校验
///
/// 阈值取有效脉冲最短和最长的中间值，长于阈值为1。
/// 丢失的脉冲按帧开头的0位补齐。
pub fn decode(capture: &PulseCapture) -> Result<RawFrame, DecodeError> {
    let valid: Vec<u32> = capture
        .pulses()
        .iter()
        .copied()
        .filter(|&pulse| pulse < END_OF_FRAME_US)
        .collect();

    if valid.len() < MIN_VALID_PULSES {
        return Err(DecodeError::InsufficientPulses {
            valid: valid.len(),
            required: MIN_VALID_PULSES,
        });
    }

    let (min, max) = valid
        .iter()
        .fold((u32::MAX, 0), |(min, max), &p| (min.min(p), max.max(p)));
    let threshold = (min + max) / 2;

    let missing = FRAME_BITS.saturating_sub(valid.len());
    let bits = std::iter::repeat_n(false, missing)
        .chain(valid.iter().map(|&pulse| pulse > threshold))
        .take(FRAME_BITS);

    let mut bytes = [0u8; 5];
    for (index, bit) in bits.enumerate() {
        let byte = &mut bytes[index / 8];
        *byte = (*byte << 1) | bit as u8;
    }

    let expected = RawFrame::checksum(&bytes[..4]);
    if expected != bytes[4] {
        return Err(DecodeError::ChecksumMismatch {
            expected,
            actual: bytes[4],
        });
    }

    Ok(RawFrame { bytes })
}
