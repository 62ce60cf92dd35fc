//! 客户端组协作方边界
//!
//! 连接管理、重连、分发策略与序列化都发生在客户端组内部，
//! 本层只通过该接口发送命令并接收异步结果。

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SenderError, SenderResult};
use crate::types::{AsyncResult, ClientId, Seq, SendTicket};

/// 客户端组接口
///
/// 实现必须支持多个在途发送操作并发使用（内部自行串行化/路由）。
/// 结果通过 `send` 时传入的通道异步投递。
#[async_trait]
pub trait ClientGroup<C, R>: Send + Sync {
    /// 发送命令，结果投递到 `results`
    ///
    /// 成功时返回关联凭据；失败时命令未入队。
    async fn send(
        &self,
        cmd: &C,
        results: mpsc::Sender<AsyncResult<R>>,
    ) -> SenderResult<SendTicket>;

    /// 发送命令并由客户端组在 `deadline` 前强制交付结果
    ///
    /// 该截止时间独立于调用方上下文的取消，由组侧自行执行
    /// （例如不可达时直接让发送失败）。
    async fn send_with_deadline(
        &self,
        cmd: &C,
        results: mpsc::Sender<AsyncResult<R>>,
        deadline: Instant,
    ) -> SenderResult<SendTicket>;

    /// 指定关联是否仍在挂起
    fn has(&self, seq: Seq, client_id: ClientId) -> bool;

    /// 取消对挂起关联的关注（尽力而为）
    ///
    /// 客户端超时后调用，组侧不再为一个不会被消费的结果保留资源。
    async fn forget(&self, seq: Seq, client_id: ClientId);

    /// 组关闭时被取消的信号
    fn done(&self) -> CancellationToken;

    /// 组层面的错误（如果有）
    fn err(&self) -> Option<SenderError>;

    /// 关闭客户端组
    async fn close(&self) -> SenderResult<()>;
}
