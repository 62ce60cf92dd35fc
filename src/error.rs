//! 发送器统一错误类型定义

use thiserror::Error;

/// 发送器错误类型
///
/// 所有错误都以返回值传播，发送编排层内部不做任何重试。
/// 派生 `Clone + PartialEq`，便于调用方（和测试）对哨兵错误做精确比较。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SenderError {
    /// 命令已发出但在预期时间内未收到结果
    #[error("timeout waiting for result")]
    Timeout,

    /// 熔断器处于打开状态，命令未被发送
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// 客户端组未能接受/分发命令
    #[error("failed to send command: {0}")]
    SendFailed(String),

    /// 服务端随结果返回的错误
    #[error("server error: {0}")]
    Server(String),

    /// 结果通道在收到结果前被关闭
    #[error("result channel closed")]
    ChannelClosed,

    /// Hook 在发送前拒绝了本次操作
    #[error("rejected before send: {0}")]
    Rejected(String),

    /// 内部错误
    #[error("internal error: {0}")]
    Internal(String),
}

/// 发送器结果类型
pub type SenderResult<T> = Result<T, SenderError>;
