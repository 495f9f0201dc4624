//! 错误类型定义
//!
//! 钱包集成核心的统一错误分类：配置错误和提供者缺失错误
//! 直接向调用方传播；轮询期间的瞬时RPC错误由下一个轮询周期重试

use thiserror::Error;

use crate::provider::ProviderRpcError;

pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Debug, Error)]
pub enum WalletError {
    /// 环境中没有注入钱包提供者
    #[error("no wallet provider available in this environment")]
    NoProvider,

    /// 用户拒绝了授权请求（或返回了空账户列表）
    #[error("user rejected the authorization request")]
    UserRejected,

    /// 合约配置缺失或非法（缺少ABI/地址，或地址为零地址哨兵值）
    #[error("contract configuration error: {0}")]
    Configuration(String),

    /// 提供者拒绝了链切换/注册请求（4902以外的错误码）
    #[error("chain switch rejected by provider (code {code}): {message}")]
    ChainSwitch { code: i64, message: String },

    /// 主备两个价格源全部失败
    #[error("gold price unavailable: all sources failed")]
    PriceUnavailable,

    /// 通用远程调用失败，由下一个轮询周期重试
    #[error("rpc call failed: {0}")]
    Rpc(String),
}

impl WalletError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// 瞬时错误判断：轮询边界吞掉此类错误，等待下一轮
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::PriceUnavailable)
    }
}

impl From<ProviderRpcError> for WalletError {
    fn from(err: ProviderRpcError) -> Self {
        match err.code {
            crate::provider::error_codes::USER_REJECTED => Self::UserRejected,
            _ => Self::Rpc(format!("provider error {}: {}", err.code, err.message)),
        }
    }
}
