//! 合约网关
//!
//! 按逻辑名解析合约描述符并绑定调用方上下文（只读provider或签名
//! middleware），返回可调用的合约句柄。解析无状态且廉价，不做缓存

use std::collections::HashMap;
use std::sync::Arc;

use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::providers::Middleware;
use ethers::types::Address;

use crate::config::ContractsConfig;
use crate::domain::contract::{names, ContractDescriptor, CONTRACT_ABIS};
use crate::error::{Result, WalletError};

pub struct ContractGateway {
    contracts: HashMap<String, ContractDescriptor>,
}

impl ContractGateway {
    /// 从合约配置构建网关
    ///
    /// 地址格式已在配置加载时验证过；这里解析失败归为配置错误
    pub fn from_config(config: &ContractsConfig) -> Result<Self> {
        let mut contracts = HashMap::new();

        for logical_name in [
            names::GOLD_TOKEN,
            names::TOKEN_MANAGER,
            names::GOLD_PRICE_ORACLE,
            names::GOLD_READER,
        ] {
            let raw = config.address_for(logical_name).ok_or_else(|| {
                WalletError::configuration(format!("no address entry for {}", logical_name))
            })?;
            let address: Address = raw.parse().map_err(|_| {
                WalletError::configuration(format!(
                    "invalid address for {}: {}",
                    logical_name, raw
                ))
            })?;
            let abi_json = *CONTRACT_ABIS.get(logical_name).ok_or_else(|| {
                WalletError::configuration(format!("no abi registered for {}", logical_name))
            })?;

            contracts.insert(
                logical_name.to_string(),
                ContractDescriptor {
                    logical_name: logical_name.to_string(),
                    abi_json,
                    address,
                },
            );
        }

        Ok(Self { contracts })
    }

    /// 按逻辑名查找描述符；零地址视为未配置
    pub fn descriptor(&self, logical_name: &str) -> Result<&ContractDescriptor> {
        let descriptor = self.contracts.get(logical_name).ok_or_else(|| {
            WalletError::configuration(format!("unknown contract: {}", logical_name))
        })?;

        if !descriptor.is_configured() {
            return Err(WalletError::configuration(format!(
                "contract {} is not configured (zero address)",
                logical_name
            )));
        }

        Ok(descriptor)
    }

    /// 合约是否已配置（存在且地址非零）
    pub fn is_configured(&self, logical_name: &str) -> bool {
        self.contracts
            .get(logical_name)
            .map(|d| d.is_configured())
            .unwrap_or(false)
    }

    /// 解析合约并绑定调用方上下文
    ///
    /// `client`传只读provider时句柄用于读调用，传签名middleware时
    /// 用于状态变更调用
    pub fn resolve<M: Middleware>(
        &self,
        logical_name: &str,
        client: Arc<M>,
    ) -> Result<Contract<M>> {
        let descriptor = self.descriptor(logical_name)?;

        let abi: Abi = serde_json::from_str(descriptor.abi_json).map_err(|e| {
            WalletError::configuration(format!("abi for {} does not parse: {}", logical_name, e))
        })?;

        Ok(Contract::new(descriptor.address, abi, client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZERO_ADDRESS;

    fn config_with_reader(reader: &str) -> ContractsConfig {
        ContractsConfig {
            gold_token_address: "0x1111111111111111111111111111111111111111".into(),
            token_manager_address: "0x2222222222222222222222222222222222222222".into(),
            gold_price_oracle_address: "0x3333333333333333333333333333333333333333".into(),
            gold_reader_address: reader.into(),
        }
    }

    #[test]
    fn test_descriptor_rejects_zero_address() {
        let gateway = ContractGateway::from_config(&config_with_reader(ZERO_ADDRESS)).unwrap();

        let err = gateway.descriptor(names::GOLD_READER).unwrap_err();
        assert!(matches!(err, WalletError::Configuration(_)));
        assert!(!gateway.is_configured(names::GOLD_READER));
    }

    #[test]
    fn test_descriptor_returns_configured_contract() {
        let gateway = ContractGateway::from_config(&config_with_reader(
            "0x4444444444444444444444444444444444444444",
        ))
        .unwrap();

        let desc = gateway.descriptor(names::GOLD_READER).unwrap();
        assert_eq!(desc.logical_name, names::GOLD_READER);
        assert!(gateway.is_configured(names::GOLD_READER));
    }

    #[test]
    fn test_unknown_logical_name_is_configuration_error() {
        let gateway = ContractGateway::from_config(&config_with_reader(ZERO_ADDRESS)).unwrap();
        assert!(matches!(
            gateway.descriptor("NOT_A_CONTRACT"),
            Err(WalletError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_binds_read_client() {
        use ethers::providers::{Http, Provider};

        let gateway = ContractGateway::from_config(&config_with_reader(
            "0x4444444444444444444444444444444444444444",
        ))
        .unwrap();

        let provider =
            Arc::new(Provider::<Http>::try_from("http://localhost:8545").unwrap());
        let contract = gateway.resolve(names::GOLD_READER, provider).unwrap();
        assert_eq!(
            contract.address(),
            "0x4444444444444444444444444444444444444444"
                .parse::<Address>()
                .unwrap()
        );
    }
}
