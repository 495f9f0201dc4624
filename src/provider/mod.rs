//! 钱包提供者抽象
//!
//! 提供者以显式能力对象的形式注入会话管理器，绝不作为环境全局状态引用，
//! 因此测试中可以替换为测试替身。接口与EIP-1193对齐：
//! `request({method, params})` 加上 accountsChanged / chainChanged 事件流

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod rpc;

pub use rpc::RpcWalletProvider;

/// EIP-1193 标准错误码
pub mod error_codes {
    /// 用户拒绝请求
    pub const USER_REJECTED: i64 = 4001;
    /// 提供者不认识目标链，需要先注册
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
}

/// 提供者级RPC错误（携带EIP-1193错误码）
#[derive(Debug, Clone, Error)]
#[error("provider rpc error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// 提供者级事件
///
/// 载荷格式与注入式钱包一致：账户为有序地址字符串列表，
/// 链ID为十六进制字符串（"0x1e"）
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

/// 注入式钱包提供者接口
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// 发起提供者请求，挂起直到远端响应或拒绝到达
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// 订阅提供者事件流
    ///
    /// 每个存活会话只允许持有一对订阅；重复订阅而不先释放是使用错误
    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}
