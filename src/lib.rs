//! Flare Sender 命令流发送编排层
//!
//! 在已建立的客户端组之上提供发送命令并等待异步结果的高层抽象：
//! - 单结果 / 多结果发送，均支持可选的组侧截止时间
//! - 取消信号与结果通道之间的双路等待，超时后释放关联槽位
//! - 每次发送独立的生命周期 Hook 链（可观测 / 熔断等横切能力）
//! - 熔断装饰器与弹性预设配置
//!
//! 传输、重连、序列化与重试策略都属于客户端组或调用方的职责，
//! 本层不做任何重试，也不跨进程持久化状态。

pub mod breaker;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod handler;
pub mod hooks;
pub mod sender;
pub mod types;

pub use breaker::{BreakerState, SlidingWindowBreaker};
pub use config::ResilientConfig;
pub use context::SendContext;
pub use error::{SenderError, SenderResult};
pub use group::ClientGroup;
pub use handler::ResultHandler;
pub use hooks::{
    CircuitBreaker, CircuitBreakerHooks, CircuitBreakerHooksFactory, Hooks, HooksFactory,
    NoopHooks, NoopHooksFactory, ReceivedResult, SentCmd, TracingHooks, TracingHooksFactory,
};
pub use sender::Sender;
pub use types::{AsyncResult, ClientId, CmdResult, SendTicket, Seq};
