//! 发送操作上下文
//!
//! `SendContext` 只约束等待结果这一步：命令一旦交给客户端组，
//! 取消上下文不会中止传输层的发送，只会让发送器停止等待并释放关联槽位。

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 发送操作的取消/截止上下文
///
/// 廉价可克隆。`done()` 在取消或截止时间到达时完成；
/// 两者都不存在时永远挂起（即无限等待结果）。
#[derive(Debug, Clone, Default)]
pub struct SendContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl SendContext {
    /// 创建一个既无截止时间也未取消的上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带绝对截止时间的上下文
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// 创建带相对超时的上下文
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// 主动取消本次操作的等待
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 上下文是否已完成（被取消或已过截止时间）
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// 截止时间（如果设置过）
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 返回一个与外层取消完全脱钩的新上下文
    ///
    /// 供 `before_send` Hook 替换上下文使用：操作改为自行管理超时，
    /// 不再受调用方取消影响。
    pub fn detached(&self) -> Self {
        Self::new()
    }

    /// 等待上下文完成（取消或截止时间到达）
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}
