//! 熔断 Hook 装饰器
//!
//! 在任意内层 Hook 外再包一层熔断逻辑：发送前询问熔断器是否放行，
//! 错误/超时记为失败、收到结果记为成功，然后再委托给内层 Hook。

use std::sync::Arc;

use super::{Hooks, HooksFactory, ReceivedResult, SentCmd};
use crate::context::SendContext;
use crate::error::{SenderError, SenderResult};

/// 熔断器能力接口
///
/// 熔断器是唯一被并发操作共享和修改的资源，实现必须内部线程安全。
pub trait CircuitBreaker: Send + Sync {
    /// 当前是否放行新的发送
    fn allow(&self) -> bool;
    /// 记录一次失败（组侧发送失败或超时）
    fn fail(&self);
    /// 记录一次成功（收到结果）
    fn success(&self);
}

/// 熔断 Hook 工厂
///
/// 熔断器在所有操作间共享（它是聚合点），内层工厂照常为每次发送
/// 产出新的内层 Hook 实例。
pub struct CircuitBreakerHooksFactory<C, R> {
    breaker: Arc<dyn CircuitBreaker>,
    inner: Arc<dyn HooksFactory<C, R>>,
}

impl<C, R> CircuitBreakerHooksFactory<C, R> {
    /// 创建熔断 Hook 工厂
    pub fn new(breaker: Arc<dyn CircuitBreaker>, inner: Arc<dyn HooksFactory<C, R>>) -> Self {
        Self { breaker, inner }
    }
}

impl<C, R> HooksFactory<C, R> for CircuitBreakerHooksFactory<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn create(&self) -> Box<dyn Hooks<C, R>> {
        Box::new(CircuitBreakerHooks::new(
            Arc::clone(&self.breaker),
            self.inner.create(),
        ))
    }
}

/// 熔断 Hook
///
/// 纯装饰器：实现同一套 Hook 契约，可与任何其他实现透明组合，
/// 自身也可以被再次包裹。
pub struct CircuitBreakerHooks<C, R> {
    breaker: Arc<dyn CircuitBreaker>,
    inner: Box<dyn Hooks<C, R>>,
}

impl<C, R> CircuitBreakerHooks<C, R> {
    /// 用共享熔断器包裹一个内层 Hook 实例
    pub fn new(breaker: Arc<dyn CircuitBreaker>, inner: Box<dyn Hooks<C, R>>) -> Self {
        Self { breaker, inner }
    }
}

impl<C, R> Hooks<C, R> for CircuitBreakerHooks<C, R>
where
    C: Send,
    R: Send,
{
    fn before_send(&mut self, ctx: SendContext, cmd: &C) -> SenderResult<SendContext> {
        if !self.breaker.allow() {
            // 不放行：命令不会被发送，内层 before_send 也不触发
            return Err(SenderError::CircuitOpen);
        }
        self.inner.before_send(ctx, cmd)
    }

    fn on_error(&mut self, ctx: &SendContext, sent_cmd: &SentCmd<C>, err: &SenderError) {
        self.breaker.fail();
        self.inner.on_error(ctx, sent_cmd, err);
    }

    fn on_result(&mut self, ctx: &SendContext, sent_cmd: &SentCmd<C>, recv: &ReceivedResult<R>) {
        // 只要结果送达就记成功，即使结果本身携带服务端错误：
        // 熔断器跟踪的是传输层健康度，不是应用层结果
        self.breaker.success();
        self.inner.on_result(ctx, sent_cmd, recv);
    }

    fn on_timeout(&mut self, ctx: &SendContext, sent_cmd: &SentCmd<C>, err: &SenderError) {
        self.breaker.fail();
        self.inner.on_timeout(ctx, sent_cmd, err);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::hooks::NoopHooksFactory;

    /// 可手动控制的熔断器桩
    #[derive(Default)]
    struct StubBreaker {
        allow: AtomicBool,
        fails: AtomicUsize,
        successes: AtomicUsize,
    }

    impl StubBreaker {
        fn allowing(allow: bool) -> Arc<Self> {
            let stub = Self::default();
            stub.allow.store(allow, Ordering::SeqCst);
            Arc::new(stub)
        }
    }

    impl CircuitBreaker for StubBreaker {
        fn allow(&self) -> bool {
            self.allow.load(Ordering::SeqCst)
        }
        fn fail(&self) {
            self.fails.fetch_add(1, Ordering::SeqCst);
        }
        fn success(&self) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 记录 before_send 调用次数的内层 Hook
    struct CountingHooks {
        before_sends: Arc<AtomicUsize>,
    }

    impl Hooks<String, String> for CountingHooks {
        fn before_send(&mut self, ctx: SendContext, _cmd: &String) -> SenderResult<SendContext> {
            self.before_sends.fetch_add(1, Ordering::SeqCst);
            Ok(ctx)
        }
        fn on_error(&mut self, _: &SendContext, _: &SentCmd<String>, _: &SenderError) {}
        fn on_result(&mut self, _: &SendContext, _: &SentCmd<String>, _: &ReceivedResult<String>) {}
        fn on_timeout(&mut self, _: &SendContext, _: &SentCmd<String>, _: &SenderError) {}
    }

    fn sent_cmd() -> SentCmd<String> {
        SentCmd {
            seq: 1,
            size: 10,
            cmd: "cmd".to_string(),
        }
    }

    /// 测试：熔断器不放行时返回 CircuitOpen，内层 before_send 不被调用
    #[test]
    fn test_open_breaker_blocks_before_send() {
        let breaker = StubBreaker::allowing(false);
        let before_sends = Arc::new(AtomicUsize::new(0));
        let mut hooks = CircuitBreakerHooks::new(
            breaker.clone() as Arc<dyn CircuitBreaker>,
            Box::new(CountingHooks {
                before_sends: before_sends.clone(),
            }),
        );

        let err = hooks
            .before_send(SendContext::new(), &"cmd".to_string())
            .unwrap_err();
        assert_eq!(err, SenderError::CircuitOpen);
        // 验证：内层 Hook 一次都没有被调用
        assert_eq!(before_sends.load(Ordering::SeqCst), 0);
    }

    /// 测试：放行时委托给内层 before_send
    #[test]
    fn test_closed_breaker_delegates_before_send() {
        let breaker = StubBreaker::allowing(true);
        let before_sends = Arc::new(AtomicUsize::new(0));
        let mut hooks = CircuitBreakerHooks::new(
            breaker.clone() as Arc<dyn CircuitBreaker>,
            Box::new(CountingHooks {
                before_sends: before_sends.clone(),
            }),
        );

        hooks
            .before_send(SendContext::new(), &"cmd".to_string())
            .unwrap();
        assert_eq!(before_sends.load(Ordering::SeqCst), 1);
    }

    /// 测试：错误与超时都记为熔断失败
    #[test]
    fn test_error_and_timeout_count_as_failures() {
        let breaker = StubBreaker::allowing(true);
        let mut hooks: CircuitBreakerHooks<String, String> = CircuitBreakerHooks::new(
            breaker.clone() as Arc<dyn CircuitBreaker>,
            Box::new(crate::hooks::NoopHooks),
        );

        let ctx = SendContext::new();
        hooks.on_error(&ctx, &sent_cmd(), &SenderError::SendFailed("boom".into()));
        hooks.on_timeout(&ctx, &sent_cmd(), &SenderError::Timeout);

        assert_eq!(breaker.fails.load(Ordering::SeqCst), 2);
        assert_eq!(breaker.successes.load(Ordering::SeqCst), 0);
    }

    /// 测试：携带服务端错误的结果仍然记为熔断成功
    ///
    /// 这是有意保留的策略：熔断器只统计传输层健康度，
    /// 结果内的应用层错误不算失败。
    #[test]
    fn test_result_error_still_counts_breaker_success() {
        let breaker = StubBreaker::allowing(true);
        let mut hooks: CircuitBreakerHooks<String, String> = CircuitBreakerHooks::new(
            breaker.clone() as Arc<dyn CircuitBreaker>,
            Box::new(crate::hooks::NoopHooks),
        );

        let recv = ReceivedResult::<String> {
            seq: 1,
            size: 20,
            result: Err(SenderError::Server("application failure".into())),
        };
        hooks.on_result(&SendContext::new(), &sent_cmd(), &recv);

        // 验证：成功计数 +1，失败计数不变
        assert_eq!(breaker.successes.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.fails.load(Ordering::SeqCst), 0);
    }

    /// 测试：工厂每次 create 都产出新的内层实例并共享同一熔断器
    #[test]
    fn test_factory_shares_breaker_across_instances() {
        let breaker = StubBreaker::allowing(true);
        let factory: CircuitBreakerHooksFactory<String, String> = CircuitBreakerHooksFactory::new(
            breaker.clone() as Arc<dyn CircuitBreaker>,
            Arc::new(NoopHooksFactory),
        );

        let ctx = SendContext::new();
        let mut first = factory.create();
        let mut second = factory.create();
        first.on_error(&ctx, &sent_cmd(), &SenderError::SendFailed("a".into()));
        second.on_error(&ctx, &sent_cmd(), &SenderError::SendFailed("b".into()));

        // 验证：两个实例的失败都汇聚到同一个熔断器
        assert_eq!(breaker.fails.load(Ordering::SeqCst), 2);
    }

    /// 测试：装饰器可以嵌套（熔断外再包熔断）
    #[test]
    fn test_decorator_composes_with_itself() {
        let outer = StubBreaker::allowing(true);
        let inner = StubBreaker::allowing(false);

        let mut hooks: CircuitBreakerHooks<String, String> = CircuitBreakerHooks::new(
            outer.clone() as Arc<dyn CircuitBreaker>,
            Box::new(CircuitBreakerHooks::new(
                inner.clone() as Arc<dyn CircuitBreaker>,
                Box::new(crate::hooks::NoopHooks),
            )),
        );

        // 验证：外层放行、内层拒绝，错误来自内层
        let err = hooks
            .before_send(SendContext::new(), &"cmd".to_string())
            .unwrap_err();
        assert_eq!(err, SenderError::CircuitOpen);
    }
}
