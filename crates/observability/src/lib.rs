//! # Observability
//!
//! 解码输出路由的日志与指标。
//!
//! 日志走 `tracing`，输出到 stderr。计数器 `srd_router_*` 只写入 `metrics`
//! 门面，recorder 由宿主安装；没有 recorder 时调用为空操作。
//! `ReportAggregator` 把每次 put 的 `DispatchReport` 汇总成回放结束时打印的摘要。
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init, metrics};
//!
//! observability::init()?;
//!
//! let report = session.put("uart", 0, 10, 0, &value)?;
//! aggregator.update(&report, 0, 10);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-exports
pub use crate::metrics::{
    record_callback, record_conversion_failure, record_forward, record_put, record_put_rejected,
    ReportAggregator, ReportSummary, SpanStats,
};

/// 以默认设置安装路由日志：JSON 行写到 stderr，级别 `info`
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 路由进程的日志设置，通常由 CLI 的 `--log-format` / `--log-level` 填充
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// 未设置 `RUST_LOG` 时使用的过滤指令，例如 `dispatcher=debug`
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
        }
    }
}

/// 分发事件在 stderr 上的呈现方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 每个事件一行 JSON，带 target 与源码位置，适合回放时交给 `jq`
    #[default]
    Json,
    /// 多行展开，调试堆叠链时查看 span 字段
    Pretty,
    Compact,
}

/// 安装全局 subscriber。重复调用返回错误。
///
/// `RUST_LOG` 优先于 `default_log_level`。stdout 只留给命令输出和回放摘要。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer().pretty().with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer().compact().with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }

    tracing::info!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "Observability initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_log_level, "info");
    }

    #[test]
    fn test_second_init_fails() {
        let config = ObservabilityConfig {
            log_format: LogFormat::Compact,
            default_log_level: "warn".into(),
        };
        // the first call may race with another test; the second never succeeds
        let _ = init_with_config(config.clone());
        assert!(init_with_config(config).is_err());
    }
}
