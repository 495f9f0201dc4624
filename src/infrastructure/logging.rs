//! 日志系统配置模块
//!
//! 支持结构化JSON日志、文本日志和可选的按日轮转文件输出

use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 初始化日志系统
///
/// 启用文件日志时返回worker guard，调用方必须持有它直到进程退出，
/// 否则缓冲中的日志会丢失
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_writer = if config.enable_file_logging {
        let log_dir = config
            .log_file_path
            .as_ref()
            .and_then(|p| Path::new(p).parent())
            .unwrap_or_else(|| Path::new("./logs"));
        std::fs::create_dir_all(log_dir)?;

        let appender = rolling::daily(log_dir, "goldcore.log");
        Some(non_blocking(appender))
    } else {
        None
    };

    match (config.format.as_str(), file_writer) {
        ("json", Some((writer, guard))) => {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_writer(writer).with_ansi(false))
                .with(fmt::layer().json())
                .init();
            Ok(Some(guard))
        }
        ("json", None) => {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json())
                .init();
            Ok(None)
        }
        (_, Some((writer, guard))) => {
            Registry::default()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(fmt::layer())
                .init();
            Ok(Some(guard))
        }
        (_, None) => {
            Registry::default().with(filter).with(fmt::layer()).init();
            Ok(None)
        }
    }
}

/// 简化初始化（使用默认配置）
pub fn init_default_logging() {
    let config = LoggingConfig {
        level: "info".to_string(),
        format: "text".to_string(),
        enable_file_logging: false,
        log_file_path: None,
    };
    if init_logging(&config).is_err() {
        // 回退到最基本的日志初始化
        tracing_subscriber::fmt::init();
    }
}
