//! 合约描述符模块
//!
//! 部署合约的逻辑名、ABI与地址；按逻辑名在调用时查找。
//! 零地址是"未配置"哨兵值，必须视为缺失而非合法目标

use std::collections::HashMap;

use ethers::types::Address;
use once_cell::sync::Lazy;

/// 逻辑合约名
pub mod names {
    /// 黄金锚定代币（ERC20）
    pub const GOLD_TOKEN: &str = "GOLD_TOKEN";
    /// 铸造/赎回管理合约
    pub const TOKEN_MANAGER: &str = "TOKEN_MANAGER";
    /// 金价预言机（备用价格源，无时间戳）
    pub const GOLD_PRICE_ORACLE: &str = "GOLD_PRICE_ORACLE";
    /// 跨链金价读取器（主价格源，带staleness上报）
    pub const GOLD_READER: &str = "GOLD_READER";
}

const GOLD_TOKEN_ABI: &str = r#"[
    {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"totalSupply","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"decimals","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint8"}]}
]"#;

const TOKEN_MANAGER_ABI: &str = r#"[
    {"type":"function","name":"mint","stateMutability":"payable","inputs":[{"name":"usdAmount","type":"uint256"}],"outputs":[]},
    {"type":"function","name":"redeem","stateMutability":"nonpayable","inputs":[{"name":"tokenAmount","type":"uint256"}],"outputs":[]},
    {"type":"function","name":"calculateTokenAmount","stateMutability":"view","inputs":[{"name":"usdAmount","type":"uint256"}],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"calculateCollateralAmount","stateMutability":"view","inputs":[{"name":"tokenAmount","type":"uint256"}],"outputs":[{"name":"","type":"uint256"}]}
]"#;

const GOLD_PRICE_ORACLE_ABI: &str = r#"[
    {"type":"function","name":"getGoldPricePerGram","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]}
]"#;

const GOLD_READER_ABI: &str = r#"[
    {"type":"function","name":"getGoldPricePerGram","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"lastUpdated","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"isPriceStale","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"updatePrice","stateMutability":"nonpayable","inputs":[],"outputs":[]}
]"#;

/// 逻辑名到ABI的映射表
pub static CONTRACT_ABIS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (names::GOLD_TOKEN, GOLD_TOKEN_ABI),
        (names::TOKEN_MANAGER, TOKEN_MANAGER_ABI),
        (names::GOLD_PRICE_ORACLE, GOLD_PRICE_ORACLE_ABI),
        (names::GOLD_READER, GOLD_READER_ABI),
    ])
});

/// 合约描述符，每次部署固定一份
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub logical_name: String,
    pub abi_json: &'static str,
    pub address: Address,
}

impl ContractDescriptor {
    /// 地址是否为零地址哨兵（未配置）
    pub fn is_configured(&self) -> bool {
        self.address != Address::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::Abi;

    #[test]
    fn test_embedded_abis_parse() {
        for (name, json) in CONTRACT_ABIS.iter() {
            let abi: Abi = serde_json::from_str(json)
                .unwrap_or_else(|e| panic!("abi for {} does not parse: {}", name, e));
            assert!(!abi.functions.is_empty(), "abi for {} has no functions", name);
        }
    }

    #[test]
    fn test_reader_abi_exposes_staleness_surface() {
        let abi: Abi = serde_json::from_str(CONTRACT_ABIS[names::GOLD_READER]).unwrap();
        assert!(abi.function("lastUpdated").is_ok());
        assert!(abi.function("isPriceStale").is_ok());
        assert!(abi.function("getGoldPricePerGram").is_ok());
        assert!(abi.function("updatePrice").is_ok());
    }

    #[test]
    fn test_zero_address_is_unconfigured() {
        let desc = ContractDescriptor {
            logical_name: names::GOLD_READER.to_string(),
            abi_json: GOLD_READER_ABI,
            address: Address::zero(),
        };
        assert!(!desc.is_configured());
    }
}
