//! 网络协调服务
//!
//! 保证活动链落在允许集合内：先请求切换，提供者不认识目标链
//! （错误码4902）时再请求注册完整链描述符

use std::sync::Arc;

use serde_json::json;

use crate::domain::chain::ChainDescriptor;
use crate::error::{Result, WalletError};
use crate::provider::{error_codes, WalletProvider};

/// `ensure_chain`的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// 提供者接受了切换请求
    Switched,
    /// 目标链已注册但未重试切换，需要调用方再次发起
    Registered,
}

pub struct NetworkReconciler {
    provider: Arc<dyn WalletProvider>,
}

impl NetworkReconciler {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self { provider }
    }

    /// 请求提供者把活动链切换到目标链
    ///
    /// 注册成功后不会自动重试切换（钱包UI会提示用户再次确认）。
    /// TODO: 评估注册成功后自动重发一次 wallet_switchEthereumChain
    pub async fn ensure_chain(&self, target: &ChainDescriptor) -> Result<ChainOutcome> {
        let switch_params = json!([{ "chainId": target.chain_id_hex() }]);

        match self
            .provider
            .request("wallet_switchEthereumChain", switch_params)
            .await
        {
            Ok(_) => {
                tracing::info!(
                    chain_id = target.chain_id,
                    chain = %target.name,
                    "Switched active chain"
                );
                Ok(ChainOutcome::Switched)
            }
            Err(err) if err.code == error_codes::UNRECOGNIZED_CHAIN => {
                tracing::info!(
                    chain_id = target.chain_id,
                    chain = %target.name,
                    "Chain unknown to provider, requesting registration"
                );
                self.register_chain(target).await?;
                Ok(ChainOutcome::Registered)
            }
            Err(err) => {
                tracing::warn!(
                    chain_id = target.chain_id,
                    code = err.code,
                    error = %err.message,
                    "Provider rejected chain switch"
                );
                Err(WalletError::ChainSwitch {
                    code: err.code,
                    message: err.message,
                })
            }
        }
    }

    /// 向提供者注册完整链描述符
    async fn register_chain(&self, target: &ChainDescriptor) -> Result<()> {
        let add_params = json!([target.registration_params()]);

        self.provider
            .request("wallet_addEthereumChain", add_params)
            .await
            .map_err(|err| {
                tracing::warn!(
                    chain_id = target.chain_id,
                    code = err.code,
                    error = %err.message,
                    "Provider rejected chain registration"
                );
                WalletError::ChainSwitch {
                    code: err.code,
                    message: err.message,
                }
            })?;

        tracing::info!(chain_id = target.chain_id, chain = %target.name, "Chain registered");
        Ok(())
    }
}
