use tracing::debug;

/// 默认实时优先级(SCHED_FIFO)
pub const DEFAULT_REALTIME_PRIORITY: i32 = 99;

/// 实时调度守卫
///
/// 读取期间把当前线程提升为`SCHED_FIFO`，减少微秒级轮询被抢占的抖动。
/// 提升失败(例如权限不足)不算错误，按普通优先级继续；守卫销毁时恢复`SCHED_OTHER`。
#[derive(Debug)]
pub struct RealtimeGuard {
    elevated: bool,
}

impl RealtimeGuard {
    /// 尝试提升当前线程的调度优先级，`None`表示不提升
    pub fn elevate(priority: Option<i32>) -> Self {
        let Some(priority) = priority else {
            return Self { elevated: false };
        };

        let param = libc::sched_param {
            sched_priority: priority,
        };
        // SAFETY: pid 0表示当前线程，param在调用期间有效
        let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
        if rc != 0 {
            debug!(
                "无法切换到SCHED_FIFO({}): {}, 以普通优先级读取",
                priority,
                std::io::Error::last_os_error()
            );
            return Self { elevated: false };
        }

        Self { elevated: true }
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }
}

impl Drop for RealtimeGuard {
    fn drop(&mut self) {
        if !self.elevated {
            return;
        }
        let param = libc::sched_param { sched_priority: 0 };
        // SAFETY: 同上
        let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_OTHER, &param) };
        if rc != 0 {
            debug!("恢复SCHED_OTHER失败: {}", std::io::Error::last_os_error());
        }
    }
}
