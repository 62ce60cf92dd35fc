//! 滑动窗口熔断器
//!
//! 状态机：
//! - Closed：正常放行，统计最近 N 次结果的失败率
//! - Open：失败率越线后打开，打开期间直接拒绝
//! - HalfOpen：打开时长结束后放行试探请求，连续成功达到阈值则闭合，
//!   任一失败立刻回到 Open

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::hooks::CircuitBreaker;

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// 闭合，正常放行
    Closed,
    /// 打开，拒绝所有请求
    Open,
    /// 半开，放行试探请求
    HalfOpen,
}

/// 状态变更回调
pub type StateChangeCallback = Box<dyn Fn(BreakerState) + Send + Sync>;

struct BreakerInner {
    state: BreakerState,
    /// 最近 window_size 次结果，true 表示失败
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

/// 基于计数滑动窗口的熔断器
///
/// 失败率只在窗口集满后评估，避免首个失败就触发熔断。
/// 内部用互斥锁保护，可被并发在途操作安全共享。
pub struct SlidingWindowBreaker {
    window_size: usize,
    failure_rate: f64,
    open_duration: Duration,
    success_threshold: u32,
    on_state_change: Option<StateChangeCallback>,
    inner: Mutex<BreakerInner>,
}

impl SlidingWindowBreaker {
    /// 创建熔断器
    ///
    /// `failure_rate` 取值 0.0–1.0；参数合法性由上层配置负责校验。
    pub fn new(
        window_size: usize,
        failure_rate: f64,
        open_duration: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            window_size,
            failure_rate,
            open_duration,
            success_threshold,
            on_state_change: None,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                half_open_successes: 0,
            }),
        }
    }

    /// 设置状态变更回调
    pub fn with_state_change_callback(mut self, callback: StateChangeCallback) -> Self {
        self.on_state_change = Some(callback);
        self
    }

    /// 当前状态
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // 持锁代码不会 panic，中毒视为不可达
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, inner: &mut BreakerInner, to: BreakerState) {
        if inner.state == to {
            return;
        }
        match to {
            BreakerState::Open => warn!(from = ?inner.state, "circuit breaker opened"),
            _ => info!(from = ?inner.state, to = ?to, "circuit breaker state changed"),
        }
        inner.state = to;
        if let Some(cb) = &self.on_state_change {
            cb(to);
        }
    }

    fn record(&self, inner: &mut BreakerInner, failed: bool) {
        inner.window.push_back(failed);
        while inner.window.len() > self.window_size {
            inner.window.pop_front();
        }
    }

    fn current_failure_rate(inner: &BreakerInner) -> f64 {
        let failures = inner.window.iter().filter(|f| **f).count();
        failures as f64 / inner.window.len() as f64
    }
}

impl CircuitBreaker for SlidingWindowBreaker {
    fn allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let expired = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.open_duration)
                    .unwrap_or(true);
                if expired {
                    inner.half_open_successes = 0;
                    self.transition(&mut inner, BreakerState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn fail(&self) {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => {
                self.record(&mut inner, true);
                if inner.window.len() >= self.window_size
                    && Self::current_failure_rate(&inner) >= self.failure_rate
                {
                    inner.opened_at = Some(Instant::now());
                    inner.window.clear();
                    self.transition(&mut inner, BreakerState::Open);
                }
            }
            BreakerState::HalfOpen => {
                // 试探失败，重新打开并刷新打开时刻
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, BreakerState::Open);
            }
            BreakerState::Open => {}
        }
    }

    fn success(&self) {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => self.record(&mut inner, false),
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.success_threshold {
                    inner.window.clear();
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn breaker() -> SlidingWindowBreaker {
        SlidingWindowBreaker::new(4, 0.5, Duration::from_millis(20), 2)
    }

    /// 测试：窗口未满时不评估失败率
    #[test]
    fn test_no_trip_before_window_full() {
        let b = breaker();
        b.fail();
        b.fail();
        b.fail();
        // 验证：3 个样本 < 窗口大小 4，仍然闭合
        assert_eq!(b.state(), BreakerState::Closed);
        assert!(b.allow());
    }

    /// 测试：失败率达到阈值后打开并拒绝
    #[test]
    fn test_opens_at_failure_rate() {
        let b = breaker();
        b.success();
        b.success();
        b.fail();
        b.fail();
        // 验证：4 个样本中 2 个失败，失败率 0.5 达到阈值
        assert_eq!(b.state(), BreakerState::Open);
        assert!(!b.allow());
    }

    /// 测试：打开时长结束后进入半开，连续成功后闭合
    #[test]
    fn test_half_open_then_close() {
        let b = breaker();
        b.fail();
        b.fail();
        b.fail();
        b.fail();
        assert_eq!(b.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(30));
        // 验证：打开时长已过，放行试探
        assert!(b.allow());
        assert_eq!(b.state(), BreakerState::HalfOpen);

        b.success();
        assert_eq!(b.state(), BreakerState::HalfOpen);
        b.success();
        // 验证：达到成功阈值 2，闭合
        assert_eq!(b.state(), BreakerState::Closed);
    }

    /// 测试：半开状态下失败立即重新打开
    #[test]
    fn test_half_open_failure_reopens() {
        let b = breaker();
        b.fail();
        b.fail();
        b.fail();
        b.fail();
        std::thread::sleep(Duration::from_millis(30));
        assert!(b.allow());
        assert_eq!(b.state(), BreakerState::HalfOpen);

        b.fail();
        assert_eq!(b.state(), BreakerState::Open);
        assert!(!b.allow());
    }

    /// 测试：状态变更回调被触发
    #[test]
    fn test_state_change_callback() {
        let changes = Arc::new(AtomicUsize::new(0));
        let counted = changes.clone();
        let b = breaker().with_state_change_callback(Box::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        b.fail();
        b.fail();
        b.fail();
        b.fail();
        // 验证：Closed -> Open 触发一次
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }
}
