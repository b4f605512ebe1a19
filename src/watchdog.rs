use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::error;

use crate::cancel::CancelToken;
use crate::line::held_line;

/// 整个读取流程的超时上限(秒)
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);

/// 看门狗触发后等待针脚被释放的宽限时间
const RELEASE_GRACE: Duration = Duration::from_secs(1);

/// 看门狗
///
/// 在后台线程计时，超时后取消令牌，等待轮询循环退出并释放针脚，
/// 然后强制结束进程(退出码1)。`disarm`或销毁即解除。
///
/// 针脚只在轮询循环看到取消后由守卫释放。如果读针脚本身卡死，
/// 守卫不会销毁，宽限时间过后进程直接退出，由内核回收针脚。
pub struct Watchdog {
    disarm: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// 启动看门狗
    pub fn arm(ceiling: Duration, cancel: CancelToken) -> Self {
        Self::arm_with(ceiling, cancel, || std::process::exit(1))
    }

    /// 启动看门狗，超时后执行`terminate`代替退出进程
    pub fn arm_with<F>(ceiling: Duration, cancel: CancelToken, terminate: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            match rx.recv_timeout(ceiling) {
                Err(RecvTimeoutError::Timeout) => {}
                // 已解除
                _ => return,
            }

            error!("看门狗超时，GPIO操作挂起");
            cancel.cancel();

            // 给轮询循环一点时间自己退出，守卫销毁时会释放针脚
            let start = Instant::now();
            while let Some(offset) = held_line() {
                if start.elapsed() > RELEASE_GRACE {
                    error!("GPIO{}仍被占用，强制退出", offset);
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }

            terminate();
        });

        Self {
            disarm: Some(tx),
            handle: Some(handle),
        }
    }

    /// 解除看门狗
    pub fn disarm(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.disarm.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
