//! 发送生命周期 Hook 链
//!
//! - 四个事件回调：`before_send`、`on_error`、`on_result`、`on_timeout`
//! - 工厂为每次逻辑发送创建全新的 Hook 实例
//! - 提供零配置的空实现与基于 tracing 的可观测实现
//! - 熔断装饰器以纯装饰方式包裹任意 Hook，可任意嵌套组合

mod circuit_breaker;
mod logging;
mod types;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerHooks, CircuitBreakerHooksFactory};
pub use logging::{TracingHooks, TracingHooksFactory};
pub use types::{ReceivedResult, SentCmd};

use crate::context::SendContext;
use crate::error::{SenderError, SenderResult};

/// 发送生命周期 Hook
///
/// 所有回调都在发送器的控制流内同步调用，没有后台执行。
/// 一个实例只服务一次发送操作，因此可以无同步地持有可变状态
/// （`&mut self` 即由此而来）。
pub trait Hooks<C, R>: Send {
    /// 在命令交给客户端组之前调用
    ///
    /// 可以替换或增强上下文（例如通过 [`SendContext::detached`]
    /// 剥离外层取消）。返回错误时发送器立即中止：不发送命令、
    /// 不触发其他 Hook，错误原样返回给调用方。
    fn before_send(&mut self, ctx: SendContext, cmd: &C) -> SenderResult<SendContext>;

    /// 客户端组未能接受/发送命令时调用，单次操作至多一次
    fn on_error(&mut self, ctx: &SendContext, sent_cmd: &SentCmd<C>, err: &SenderError);

    /// 每收到一个结果调用一次，在结果交还给调用方/处理器之前
    fn on_result(&mut self, ctx: &SendContext, sent_cmd: &SentCmd<C>, recv: &ReceivedResult<R>);

    /// 上下文在结果到达前完成时调用，`err` 为超时哨兵错误
    fn on_timeout(&mut self, ctx: &SendContext, sent_cmd: &SentCmd<C>, err: &SenderError);
}

/// Hook 工厂
///
/// 每次逻辑发送调用 `create` 一次，产出全新实例。
pub trait HooksFactory<C, R>: Send + Sync {
    /// 创建一个新的 Hook 实例
    fn create(&self) -> Box<dyn Hooks<C, R>>;
}

/// 空 Hook 实现，零配置默认值
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl<C, R> Hooks<C, R> for NoopHooks
where
    C: Send,
    R: Send,
{
    fn before_send(&mut self, ctx: SendContext, _cmd: &C) -> SenderResult<SendContext> {
        Ok(ctx)
    }

    fn on_error(&mut self, _ctx: &SendContext, _sent_cmd: &SentCmd<C>, _err: &SenderError) {}

    fn on_result(&mut self, _ctx: &SendContext, _sent_cmd: &SentCmd<C>, _recv: &ReceivedResult<R>) {
    }

    fn on_timeout(&mut self, _ctx: &SendContext, _sent_cmd: &SentCmd<C>, _err: &SenderError) {}
}

/// 空 Hook 工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooksFactory;

impl<C, R> HooksFactory<C, R> for NoopHooksFactory
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn create(&self) -> Box<dyn Hooks<C, R>> {
        Box::new(NoopHooks)
    }
}
