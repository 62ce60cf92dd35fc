//! Hook 回调携带的快照类型

use crate::error::SenderError;
use crate::types::Seq;

/// 已发送命令的不可变快照
///
/// 发送尝试结束后立即构造一次，之后传给该操作所有后续 Hook 调用，
/// 操作完成即丢弃。组侧发送失败时 `seq`/`size` 为零值。
#[derive(Debug)]
pub struct SentCmd<C> {
    /// 客户端组分配的关联序号
    pub seq: Seq,
    /// 序列化后的字节数
    pub size: usize,
    /// 调用方提交的命令
    pub cmd: C,
}

/// 收到的单个结果
///
/// 每次从结果通道读到投递时构造，一个结果一个实例。
#[derive(Debug)]
pub struct ReceivedResult<R> {
    /// 操作内从 1 开始的序数
    ///
    /// 与客户端组的关联序号不在同一编号空间，由发送器分配、永不回绕。
    pub seq: Seq,
    /// 读入的字节数
    pub size: usize,
    /// 解码后的结果，或随投递而来的错误
    pub result: Result<R, SenderError>,
}
