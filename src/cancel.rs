use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// 进程收到SIGINT/SIGTERM的标志，信号处理函数里只写这一个原子量
static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signal: libc::c_int) {
    SIGNAL_RECEIVED.store(true, Ordering::SeqCst);
}

/// 安装SIGINT/SIGTERM处理函数
///
/// 处理函数不做任何GPIO操作，只置位标志，由轮询循环发现后自行退出并释放针脚。
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: sigaction结构体全零是合法初值，处理函数只访问原子量
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// 是否收到过终止信号
pub fn signal_received() -> bool {
    SIGNAL_RECEIVED.load(Ordering::SeqCst)
}

/// 取消令牌
///
/// 满足以下任一条件即视为已取消:
/// - 调用了`cancel`(任意一个克隆)
/// - 超过截止时间
/// - 监听信号时进程收到了SIGINT/SIGTERM
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
    watch_signals: bool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时监听进程终止信号
    pub fn watching_signals() -> Self {
        Self {
            watch_signals: true,
            ..Self::default()
        }
    }

    /// 派生一个带截止时间的令牌，与原令牌共享取消标志
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
            watch_signals: self.watch_signals,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        if self.watch_signals && signal_received() {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}
