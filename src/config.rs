//! 弹性发送配置
//!
//! 提供“弹性”预设所需的全部数值参数：保活探测与熔断器滑动窗口。
//! 保活参数供（外部的）客户端组层使用，熔断参数用于构造包裹任意
//! Hook 工厂的熔断装饰层。所有必填字段为零视为编程错误，校验直接
//! panic 而不是返回运行时错误。

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::breaker::{SlidingWindowBreaker, StateChangeCallback};
use crate::hooks::{CircuitBreaker, CircuitBreakerHooksFactory, HooksFactory};

/// 弹性发送配置
///
/// `Default` 给出原始实现文档中的推荐值。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResilientConfig {
    /// 无命令发送多久后发出首个保活探测（毫秒），必须非零
    pub keepalive_time_ms: u64,
    /// 首个探测之后的保活间隔（毫秒），必须非零
    pub keepalive_intvl_ms: u64,
    /// 熔断器滑动窗口的请求数，必须非零
    pub breaker_window_size: usize,
    /// 触发熔断的失败率阈值（0.0–1.0），必须非零
    pub breaker_failure_rate: f64,
    /// 熔断打开后转入半开前的时长（毫秒），必须非零
    pub breaker_open_duration_ms: u64,
    /// 半开状态下闭合所需的连续成功次数，必须非零
    pub breaker_success_threshold: u32,
}

impl Default for ResilientConfig {
    fn default() -> Self {
        Self {
            keepalive_time_ms: 30_000,
            keepalive_intvl_ms: 10_000,
            breaker_window_size: 20,
            breaker_failure_rate: 0.5,
            breaker_open_duration_ms: 30_000,
            breaker_success_threshold: 2,
        }
    }
}

impl ResilientConfig {
    /// 校验必填字段
    ///
    /// 任一字段为零说明调用方没有完成配置，属于编程错误，直接 panic。
    pub fn validate(&self) {
        if self.keepalive_time_ms == 0 {
            panic!("keepalive_time_ms is required");
        }
        if self.keepalive_intvl_ms == 0 {
            panic!("keepalive_intvl_ms is required");
        }
        if self.breaker_window_size == 0 {
            panic!("breaker_window_size is required");
        }
        if self.breaker_failure_rate == 0.0 {
            panic!("breaker_failure_rate is required");
        }
        if self.breaker_open_duration_ms == 0 {
            panic!("breaker_open_duration_ms is required");
        }
        if self.breaker_success_threshold == 0 {
            panic!("breaker_success_threshold is required");
        }
    }

    /// 首个保活探测前的静默时长
    pub fn keepalive_time(&self) -> Duration {
        Duration::from_millis(self.keepalive_time_ms)
    }

    /// 保活探测间隔
    pub fn keepalive_intvl(&self) -> Duration {
        Duration::from_millis(self.keepalive_intvl_ms)
    }

    /// 熔断打开时长
    pub fn breaker_open_duration(&self) -> Duration {
        Duration::from_millis(self.breaker_open_duration_ms)
    }

    /// 按配置构造滑动窗口熔断器
    ///
    /// 先校验配置；字段为零会 panic。
    pub fn breaker(&self) -> SlidingWindowBreaker {
        self.validate();
        SlidingWindowBreaker::new(
            self.breaker_window_size,
            self.breaker_failure_rate,
            self.breaker_open_duration(),
            self.breaker_success_threshold,
        )
    }

    /// 按配置构造附带状态回调的熔断器
    pub fn breaker_with_callback(&self, callback: StateChangeCallback) -> SlidingWindowBreaker {
        self.breaker().with_state_change_callback(callback)
    }

    /// 用熔断装饰层包裹给定 Hook 工厂
    ///
    /// 返回的工厂每次发送都会创建新的内层 Hook 实例，
    /// 所有实例共享同一个按本配置构造的熔断器。
    pub fn hooks_factory<C, R>(
        &self,
        inner: Arc<dyn HooksFactory<C, R>>,
    ) -> CircuitBreakerHooksFactory<C, R>
    where
        C: Send + 'static,
        R: Send + 'static,
    {
        let breaker: Arc<dyn CircuitBreaker> = Arc::new(self.breaker());
        CircuitBreakerHooksFactory::new(breaker, inner)
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse resilient sender config")
    }

    /// 从 TOML 配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooksFactory;

    /// 测试：默认值即推荐值，可通过校验
    #[test]
    fn test_default_is_valid() {
        let config = ResilientConfig::default();
        config.validate();

        assert_eq!(config.keepalive_time(), Duration::from_secs(30));
        assert_eq!(config.keepalive_intvl(), Duration::from_secs(10));
        assert_eq!(config.breaker_window_size, 20);
        assert_eq!(config.breaker_failure_rate, 0.5);
        assert_eq!(config.breaker_open_duration(), Duration::from_secs(30));
        assert_eq!(config.breaker_success_threshold, 2);
    }

    /// 测试：必填字段为零时 panic
    #[test]
    #[should_panic(expected = "keepalive_time_ms is required")]
    fn test_zero_keepalive_time_panics() {
        let config = ResilientConfig {
            keepalive_time_ms: 0,
            ..Default::default()
        };
        config.validate();
    }

    /// 测试：窗口大小为零时 panic
    #[test]
    #[should_panic(expected = "breaker_window_size is required")]
    fn test_zero_window_size_panics() {
        let config = ResilientConfig {
            breaker_window_size: 0,
            ..Default::default()
        };
        config.validate();
    }

    /// 测试：失败率为零时 panic
    #[test]
    #[should_panic(expected = "breaker_failure_rate is required")]
    fn test_zero_failure_rate_panics() {
        let config = ResilientConfig {
            breaker_failure_rate: 0.0,
            ..Default::default()
        };
        config.validate();
    }

    /// 测试：从 TOML 解析，缺省字段回落到默认值
    #[test]
    fn test_from_toml() {
        let config = ResilientConfig::from_toml(
            r#"
            keepalive_time_ms = 15000
            breaker_window_size = 10
            breaker_failure_rate = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(config.keepalive_time(), Duration::from_secs(15));
        assert_eq!(config.breaker_window_size, 10);
        assert_eq!(config.breaker_failure_rate, 0.3);
        // 验证：未给出的字段取默认值
        assert_eq!(config.keepalive_intvl(), Duration::from_secs(10));
        assert_eq!(config.breaker_success_threshold, 2);
    }

    /// 测试：非法 TOML 返回错误
    #[test]
    fn test_from_toml_invalid() {
        let result = ResilientConfig::from_toml("keepalive_time_ms = \"not a number\"");
        assert!(result.is_err());
    }

    /// 测试：构造熔断 Hook 工厂
    #[test]
    fn test_hooks_factory_construction() {
        let config = ResilientConfig::default();
        let factory: CircuitBreakerHooksFactory<String, String> =
            config.hooks_factory(Arc::new(NoopHooksFactory));
        // 验证：新工厂可以正常产出 Hook 实例
        let _hooks = factory.create();
    }
}
