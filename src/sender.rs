//! 发送编排器
//!
//! 在客户端组之上提供发送命令并等待结果的高层抽象：
//! 驱动 Hook 生命周期、分发命令、在取消信号与结果通道之间双路等待。
//! 自身除不可变配置外不持有任何状态，也不加锁——每次操作独占
//! 自己的结果通道，唯一跨操作共享的可变资源是（可选的）熔断器。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::SendContext;
use crate::error::{SenderError, SenderResult};
use crate::group::ClientGroup;
use crate::handler::ResultHandler;
use crate::hooks::{Hooks, HooksFactory, NoopHooksFactory, ReceivedResult, SentCmd};
use crate::types::{AsyncResult, ClientId, CmdResult, Seq};

/// 发送器
///
/// 无跨调用状态，可廉价克隆后在多个任务中并发使用；
/// 并发安全性由客户端组内部保证。
pub struct Sender<C, R> {
    group: Arc<dyn ClientGroup<C, R>>,
    hooks_factory: Arc<dyn HooksFactory<C, R>>,
}

impl<C, R> Clone for Sender<C, R> {
    fn clone(&self) -> Self {
        Self {
            group: Arc::clone(&self.group),
            hooks_factory: Arc::clone(&self.hooks_factory),
        }
    }
}

impl<C, R> Sender<C, R>
where
    C: Send + Sync + 'static,
    R: Send + 'static,
{
    /// 创建发送器，使用空 Hook 工厂
    pub fn new(group: Arc<dyn ClientGroup<C, R>>) -> Self {
        Self::with_hooks_factory(group, Arc::new(NoopHooksFactory))
    }

    /// 创建发送器并指定 Hook 工厂
    ///
    /// 工厂为每次逻辑发送产出一个全新的 Hook 实例。
    pub fn with_hooks_factory(
        group: Arc<dyn ClientGroup<C, R>>,
        hooks_factory: Arc<dyn HooksFactory<C, R>>,
    ) -> Self {
        Self {
            group,
            hooks_factory,
        }
    }

    /// 发送命令并（在 ctx 约束下）等待单个结果
    pub async fn send(&self, ctx: SendContext, cmd: C) -> SenderResult<R> {
        let (tx, mut rx) = mpsc::channel(1);
        let mut hooks = self.hooks_factory.create();
        let ctx = hooks.before_send(ctx, &cmd)?;

        match self.group.send(&cmd, tx).await {
            Ok(ticket) => {
                let sent_cmd = SentCmd {
                    seq: ticket.seq,
                    size: ticket.bytes_written,
                    cmd,
                };
                self.receive(&ctx, &sent_cmd, &mut rx, ticket.client_id, hooks.as_mut())
                    .await
            }
            Err(err) => {
                let sent_cmd = SentCmd {
                    seq: 0,
                    size: 0,
                    cmd,
                };
                hooks.on_error(&ctx, &sent_cmd, &err);
                Err(err)
            }
        }
    }

    /// 发送命令并指定组侧截止时间，（在 ctx 约束下）等待单个结果
    ///
    /// `deadline` 由客户端组独立执行，与 ctx 自身的取消互不影响。
    pub async fn send_with_deadline(
        &self,
        ctx: SendContext,
        cmd: C,
        deadline: Instant,
    ) -> SenderResult<R> {
        let (tx, mut rx) = mpsc::channel(1);
        let mut hooks = self.hooks_factory.create();
        let ctx = hooks.before_send(ctx, &cmd)?;

        match self.group.send_with_deadline(&cmd, tx, deadline).await {
            Ok(ticket) => {
                let sent_cmd = SentCmd {
                    seq: ticket.seq,
                    size: ticket.bytes_written,
                    cmd,
                };
                self.receive(&ctx, &sent_cmd, &mut rx, ticket.client_id, hooks.as_mut())
                    .await
            }
            Err(err) => {
                let sent_cmd = SentCmd {
                    seq: 0,
                    size: 0,
                    cmd,
                };
                hooks.on_error(&ctx, &sent_cmd, &err);
                Err(err)
            }
        }
    }

    /// 发送命令并（在 ctx 约束下）等待多个结果
    ///
    /// 每收到一个结果（或超时）调用一次 `handler.handle`。循环在以下
    /// 任一条件首次出现时终止：处理器返回错误（该错误被返回）、
    /// 结果携带错误（先交给处理器再返回）、最近结果 `last_one()` 为真、
    /// 超时（处理器先收到一次超时错误）。
    pub async fn send_multi<H>(
        &self,
        ctx: SendContext,
        cmd: C,
        results_count: usize,
        handler: &mut H,
    ) -> SenderResult<()>
    where
        R: CmdResult,
        H: ResultHandler<R>,
    {
        let (tx, mut rx) = mpsc::channel(results_count.max(1));
        let mut hooks = self.hooks_factory.create();
        let ctx = hooks.before_send(ctx, &cmd)?;

        match self.group.send(&cmd, tx).await {
            Ok(ticket) => {
                let sent_cmd = SentCmd {
                    seq: ticket.seq,
                    size: ticket.bytes_written,
                    cmd,
                };
                self.receive_multi(
                    &ctx,
                    &sent_cmd,
                    &mut rx,
                    ticket.client_id,
                    hooks.as_mut(),
                    handler,
                )
                .await
            }
            Err(err) => {
                let sent_cmd = SentCmd {
                    seq: 0,
                    size: 0,
                    cmd,
                };
                hooks.on_error(&ctx, &sent_cmd, &err);
                Err(err)
            }
        }
    }

    /// 发送命令并指定组侧截止时间，（在 ctx 约束下）等待多个结果
    pub async fn send_multi_with_deadline<H>(
        &self,
        ctx: SendContext,
        cmd: C,
        results_count: usize,
        handler: &mut H,
        deadline: Instant,
    ) -> SenderResult<()>
    where
        R: CmdResult,
        H: ResultHandler<R>,
    {
        let (tx, mut rx) = mpsc::channel(results_count.max(1));
        let mut hooks = self.hooks_factory.create();
        let ctx = hooks.before_send(ctx, &cmd)?;

        match self.group.send_with_deadline(&cmd, tx, deadline).await {
            Ok(ticket) => {
                let sent_cmd = SentCmd {
                    seq: ticket.seq,
                    size: ticket.bytes_written,
                    cmd,
                };
                self.receive_multi(
                    &ctx,
                    &sent_cmd,
                    &mut rx,
                    ticket.client_id,
                    hooks.as_mut(),
                    handler,
                )
                .await
            }
            Err(err) => {
                let sent_cmd = SentCmd {
                    seq: 0,
                    size: 0,
                    cmd,
                };
                hooks.on_error(&ctx, &sent_cmd, &err);
                Err(err)
            }
        }
    }

    /// 关闭底层客户端组
    pub async fn close(&self) -> SenderResult<()> {
        self.group.close().await
    }

    /// 底层客户端组关闭时被取消的信号
    ///
    /// 供调用方独立于任何在途发送感知组级别的停机。
    pub fn done(&self) -> CancellationToken {
        self.group.done()
    }

    /// 双路等待：取消信号 vs 结果通道
    ///
    /// 偏向取消分支，保证已过期的上下文确定性地走超时路径。
    async fn receive(
        &self,
        ctx: &SendContext,
        sent_cmd: &SentCmd<C>,
        rx: &mut mpsc::Receiver<AsyncResult<R>>,
        client_id: ClientId,
        hooks: &mut dyn Hooks<C, R>,
    ) -> SenderResult<R> {
        tokio::select! {
            biased;
            _ = ctx.done() => {
                let err = SenderError::Timeout;
                hooks.on_timeout(ctx, sent_cmd, &err);
                self.group.forget(sent_cmd.seq, client_id).await;
                debug!(seq = sent_cmd.seq, client_id, "forgot pending correlation after timeout");
                Err(err)
            }
            delivered = rx.recv() => {
                let Some(async_result) = delivered else {
                    // 组丢弃了结果通道：按传输层失败上报，熔断器记失败
                    let err = SenderError::ChannelClosed;
                    hooks.on_error(ctx, sent_cmd, &err);
                    return Err(err);
                };
                let recv = ReceivedResult {
                    seq: 1,
                    size: async_result.bytes_read,
                    result: async_result.result,
                };
                hooks.on_result(ctx, sent_cmd, &recv);
                recv.result
            }
        }
    }

    /// 多结果接收循环
    ///
    /// 每个结果挂起等待一次；序数由发送器从 1 起分配，
    /// 投递顺序完全由通道决定（FIFO），本层不做任何重排。
    async fn receive_multi<H>(
        &self,
        ctx: &SendContext,
        sent_cmd: &SentCmd<C>,
        rx: &mut mpsc::Receiver<AsyncResult<R>>,
        client_id: ClientId,
        hooks: &mut dyn Hooks<C, R>,
        handler: &mut H,
    ) -> SenderResult<()>
    where
        R: CmdResult,
        H: ResultHandler<R>,
    {
        let mut ordinal: Seq = 1;
        loop {
            tokio::select! {
                biased;
                _ = ctx.done() => {
                    let err = SenderError::Timeout;
                    hooks.on_timeout(ctx, sent_cmd, &err);
                    self.group.forget(sent_cmd.seq, client_id).await;
                    debug!(seq = sent_cmd.seq, client_id, "forgot pending correlation after timeout");
                    // 处理器仍会收到一次超时错误；它若返回自己的错误则以其为准
                    handler.handle(Err(err))?;
                    return Err(SenderError::Timeout);
                }
                delivered = rx.recv() => {
                    let Some(async_result) = delivered else {
                        // 组丢弃了结果通道：按传输层失败上报，熔断器记失败
                        let err = SenderError::ChannelClosed;
                        hooks.on_error(ctx, sent_cmd, &err);
                        return Err(err);
                    };
                    let recv = ReceivedResult {
                        seq: ordinal,
                        size: async_result.bytes_read,
                        result: async_result.result,
                    };
                    hooks.on_result(ctx, sent_cmd, &recv);

                    let last_one = matches!(&recv.result, Ok(result) if result.last_one());
                    let result_err = recv.result.as_ref().err().cloned();
                    handler.handle(recv.result)?;

                    if let Some(err) = result_err {
                        return Err(err);
                    }
                    if last_one {
                        return Ok(());
                    }
                    ordinal += 1;
                }
            }
        }
    }
}
