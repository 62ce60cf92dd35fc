//! 多结果处理回调接口

use crate::error::{SenderError, SenderResult};

/// 多结果处理器
///
/// `send_multi` 每收到一个结果（或超时）调用一次 `handle`；
/// 返回错误会立即终止流式接收循环，该错误将从 `send_multi` 返回。
pub trait ResultHandler<R>: Send {
    /// 处理一个结果或伴随的错误
    fn handle(&mut self, result: Result<R, SenderError>) -> SenderResult<()>;
}

/// 让闭包直接充当处理器
impl<R, F> ResultHandler<R> for F
where
    F: FnMut(Result<R, SenderError>) -> SenderResult<()> + Send,
{
    fn handle(&mut self, result: Result<R, SenderError>) -> SenderResult<()> {
        self(result)
    }
}
