//! 基于 tracing 的可观测 Hook
//!
//! 开箱即用的日志实现：发送、结果、失败、超时各打一条结构化日志。
//! 持有单次操作的起始时间（工厂保证实例不跨操作共享，无需同步）。

use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Hooks, HooksFactory, ReceivedResult, SentCmd};
use crate::context::SendContext;
use crate::error::{SenderError, SenderResult};

/// 日志 Hook
///
/// 每次发送一个新实例，`started` 在 `before_send` 记录，
/// 用于在结果/超时日志里带上耗时。
#[derive(Debug, Default)]
pub struct TracingHooks {
    started: Option<Instant>,
}

impl<C, R> Hooks<C, R> for TracingHooks
where
    C: Send,
    R: Send,
{
    fn before_send(&mut self, ctx: SendContext, _cmd: &C) -> SenderResult<SendContext> {
        self.started = Some(Instant::now());
        debug!("sending command");
        Ok(ctx)
    }

    fn on_error(&mut self, _ctx: &SendContext, sent_cmd: &SentCmd<C>, err: &SenderError) {
        warn!(seq = sent_cmd.seq, %err, "command send failed");
    }

    fn on_result(&mut self, _ctx: &SendContext, sent_cmd: &SentCmd<C>, recv: &ReceivedResult<R>) {
        let elapsed_ms = self
            .started
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0);
        match &recv.result {
            Ok(_) => debug!(
                seq = sent_cmd.seq,
                ordinal = recv.seq,
                size = recv.size,
                elapsed_ms,
                "result received"
            ),
            Err(err) => warn!(
                seq = sent_cmd.seq,
                ordinal = recv.seq,
                size = recv.size,
                elapsed_ms,
                %err,
                "result received with server error"
            ),
        }
    }

    fn on_timeout(&mut self, _ctx: &SendContext, sent_cmd: &SentCmd<C>, err: &SenderError) {
        let elapsed_ms = self
            .started
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0);
        warn!(seq = sent_cmd.seq, elapsed_ms, %err, "command timed out");
    }
}

/// 日志 Hook 工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooksFactory;

impl<C, R> HooksFactory<C, R> for TracingHooksFactory
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn create(&self) -> Box<dyn Hooks<C, R>> {
        Box::new(TracingHooks::default())
    }
}
