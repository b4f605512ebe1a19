use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::error::NoCache;
use super::reading::SensorReading;

/// 后台记录服务写入读数的目录
pub const CACHE_DIR: &str = "/run/ws/dht";
/// 缓存超过10分钟即视为过期
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(600);

/// 缓存的读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedReading {
    pub temperature: f32,
    pub humidity: f32,
    /// 采集时间(unix秒)
    pub captured_at: i64,
}

impl CachedReading {
    /// 距离`now`的秒数，时间戳在未来时为负
    pub fn age_secs(&self, now: SystemTime) -> i64 {
        unix_secs(now) - self.captured_at
    }
}

fn unix_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// 按传感器序号读取`<base>/sensor<N>/{temperature,humidity,timestamp}`
///
/// 只读，写入由外部的记录服务负责。
#[derive(Debug, Clone)]
pub struct RunDirCache {
    base: PathBuf,
}

impl Default for RunDirCache {
    fn default() -> Self {
        Self::new(CACHE_DIR)
    }
}

impl RunDirCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// 传感器缓存目录
    pub fn sensor_dir(&self, sensor_index: usize) -> PathBuf {
        self.base.join(format!("sensor{}", sensor_index))
    }

    /// 读取缓存读数，没有时间戳或已过期都返回`NoCache`
    pub fn load_cached(&self, sensor_index: usize) -> Result<SensorReading, NoCache> {
        let cached = self.load_entry(sensor_index, SystemTime::now())?;
        Ok(SensorReading::ok(cached.temperature, cached.humidity))
    }

    /// 以`now`为当前时间读取缓存条目
    pub fn load_entry(&self, sensor_index: usize, now: SystemTime) -> Result<CachedReading, NoCache> {
        let dir = self.sensor_dir(sensor_index);
        let temperature = read_field(&dir, "temperature")?;
        let humidity = read_field(&dir, "humidity")?;
        // 没有时间戳无法判断新旧，直接拒绝
        let captured_at = read_field(&dir, "timestamp")?;

        let cached = CachedReading {
            temperature,
            humidity,
            captured_at,
        };
        let age = cached.age_secs(now);
        if age > CACHE_MAX_AGE.as_secs() as i64 {
            return Err(NoCache::Stale {
                age_secs: age as u64,
            });
        }
        Ok(cached)
    }
}

/// 读取单个字段文件，去掉首尾空白后解析
fn read_field<T: std::str::FromStr>(dir: &Path, name: &'static str) -> Result<T, NoCache> {
    let text = std::fs::read_to_string(dir.join(name)).map_err(|_| NoCache::Missing(name))?;
    text.trim().parse().map_err(|_| NoCache::Unparsable(name))
}
