//! 发送编排层核心数据模型
//!
//! - 关联序号与客户端标识：定位一次挂起的发送，用于超时后取消关注
//! - `AsyncResult`：结果通道上的投递单元，由客户端组生产、发送器消费
//! - `CmdResult`：服务端结果的能力接口（多结果流的终止判定）

use crate::error::SenderError;

/// 关联序号
///
/// 客户端组接受命令时单调分配；本层只用它在超时后调用 `forget`。
/// 注意与 `ReceivedResult::seq` 区分：后者是单次操作内从 1 开始的序数。
pub type Seq = u64;

/// 客户端标识，指明组内哪个连接接受了本次发送
pub type ClientId = u64;

/// 客户端组接受命令后返回的凭据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendTicket {
    /// 关联序号
    pub seq: Seq,
    /// 接受发送的客户端
    pub client_id: ClientId,
    /// 序列化后写出的字节数
    pub bytes_written: usize,
}

/// 结果通道上的投递单元
///
/// 每个预期结果恰好被发送器的接收循环消费一次。
#[derive(Debug)]
pub struct AsyncResult<R> {
    /// 客户端组侧的关联序号
    pub seq: Seq,
    /// 读入的字节数
    pub bytes_read: usize,
    /// 解码后的结果，或服务端/解码层面的错误
    pub result: Result<R, SenderError>,
}

/// 服务端结果能力接口
///
/// 多结果流依赖 `last_one` 判定是否收到最后一个结果。
pub trait CmdResult: Send + 'static {
    /// 本结果是否为流中最后一个
    fn last_one(&self) -> bool;
}
