//! 配置管理模块
//!
//! 支持从环境变量加载配置；合约地址的零地址默认值表示"未配置"

use anyhow::{bail, Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// 零地址哨兵（字符串形式），表示合约未配置
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub contracts: ContractsConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub polling: PollingConfig,
}

/// 合约地址配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    pub gold_token_address: String,
    pub token_manager_address: String,
    pub gold_price_oracle_address: String,
    /// 跨链读取器地址，可以保持未配置（零地址），此时只用预言机源
    pub gold_reader_address: String,
}

/// 网络配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// 价格轮询间隔（秒）
    pub price_interval_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            gold_token_address: env_or("GOLD_TOKEN_ADDRESS", ZERO_ADDRESS),
            token_manager_address: env_or("TOKEN_MANAGER_ADDRESS", ZERO_ADDRESS),
            gold_price_oracle_address: env_or("GOLD_PRICE_ORACLE_ADDRESS", ZERO_ADDRESS),
            gold_reader_address: env_or("GOLD_READER_ADDRESS", ZERO_ADDRESS),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: env_or("RPC_URL", "http://localhost:8545"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "text"),
            enable_file_logging: std::env::var("LOG_TO_FILE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            price_interval_secs: std::env::var("PRICE_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Config {
    /// 从环境变量加载配置并验证
    pub fn from_env() -> Result<Self> {
        let config = Self {
            contracts: ContractsConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
            polling: PollingConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // 地址必须是合法的20字节十六进制；零地址合法（代表未配置）
        for (key, value) in [
            ("GOLD_TOKEN_ADDRESS", &self.contracts.gold_token_address),
            ("TOKEN_MANAGER_ADDRESS", &self.contracts.token_manager_address),
            (
                "GOLD_PRICE_ORACLE_ADDRESS",
                &self.contracts.gold_price_oracle_address,
            ),
            ("GOLD_READER_ADDRESS", &self.contracts.gold_reader_address),
        ] {
            value
                .parse::<Address>()
                .with_context(|| format!("{} is not a valid address: {}", key, value))?;
        }

        if self.polling.price_interval_secs == 0 {
            bail!("PRICE_POLL_INTERVAL_SECS must be greater than zero");
        }

        Ok(())
    }
}

impl ContractsConfig {
    /// 按逻辑名取地址字符串
    pub fn address_for(&self, logical_name: &str) -> Option<&str> {
        use crate::domain::contract::names;
        match logical_name {
            names::GOLD_TOKEN => Some(&self.gold_token_address),
            names::TOKEN_MANAGER => Some(&self.token_manager_address),
            names::GOLD_PRICE_ORACLE => Some(&self.gold_price_oracle_address),
            names::GOLD_READER => Some(&self.gold_reader_address),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addresses_are_zero_sentinel() {
        let contracts = ContractsConfig {
            gold_token_address: ZERO_ADDRESS.into(),
            token_manager_address: ZERO_ADDRESS.into(),
            gold_price_oracle_address: ZERO_ADDRESS.into(),
            gold_reader_address: ZERO_ADDRESS.into(),
        };
        assert_eq!(
            contracts.gold_reader_address.parse::<Address>().unwrap(),
            Address::zero()
        );
    }

    #[test]
    fn test_validate_rejects_malformed_address() {
        let config = Config {
            contracts: ContractsConfig {
                gold_token_address: "not-an-address".into(),
                token_manager_address: ZERO_ADDRESS.into(),
                gold_price_oracle_address: ZERO_ADDRESS.into(),
                gold_reader_address: ZERO_ADDRESS.into(),
            },
            network: NetworkConfig {
                rpc_url: "http://localhost:8545".into(),
            },
            logging: LoggingConfig {
                level: "info".into(),
                format: "text".into(),
                enable_file_logging: false,
                log_file_path: None,
            },
            polling: PollingConfig {
                price_interval_secs: 30,
            },
        };

        assert!(config.validate().is_err());
    }
}
