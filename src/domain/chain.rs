//! 链配置模块
//!
//! 定义支持的区块链及其静态描述信息，来源于静态配置，创建后不可变

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Rootstock 主网链ID
pub const ROOTSTOCK_MAINNET: u64 = 30;
/// Rootstock 测试网链ID
pub const ROOTSTOCK_TESTNET: u64 = 31;
/// 本地开发链（Anvil）链ID
pub const LOCAL_DEV: u64 = 31337;

/// 原生币种信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// 链描述符
///
/// `wallet_addEthereumChain` 注册所需的完整信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub name: String,
    /// 有序RPC端点列表，靠前的优先
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    /// 链ID的十六进制编码（"0x1e"），钱包协议要求的格式
    pub fn chain_id_hex(&self) -> String {
        encode_chain_id_hex(self.chain_id)
    }

    /// `wallet_addEthereumChain` 的参数对象
    pub fn registration_params(&self) -> serde_json::Value {
        serde_json::json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "blockExplorerUrls": self.explorer_urls,
        })
    }
}

/// 链ID十六进制编码
pub fn encode_chain_id_hex(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// 解析十六进制链ID字符串（chainChanged事件的载荷格式）
pub fn parse_chain_id_hex(hex: &str) -> Option<u64> {
    let stripped = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(stripped, 16).ok()
}

/// 链配置注册表
///
/// 持有全部已知链描述符和允许的链ID集合；会话管理器用它判断
/// 当前链是否需要协调
pub struct ChainRegistry {
    configs: HashMap<u64, ChainDescriptor>,
    allowed: Vec<u64>,
    /// 协调失败时的目标链（开发环境优先本地链，与前端行为一致）
    preferred_target: u64,
}

impl ChainRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            configs: HashMap::new(),
            allowed: vec![ROOTSTOCK_MAINNET, ROOTSTOCK_TESTNET, LOCAL_DEV],
            preferred_target: LOCAL_DEV,
        };

        registry.register_default_chains();
        registry
    }

    fn register_default_chains(&mut self) {
        // Rootstock Mainnet
        self.register(ChainDescriptor {
            chain_id: ROOTSTOCK_MAINNET,
            name: "Rootstock".to_string(),
            rpc_urls: vec!["https://public-node.rsk.co".to_string()],
            native_currency: NativeCurrency {
                name: "Rootstock BTC".to_string(),
                symbol: "RBTC".to_string(),
                decimals: 18,
            },
            explorer_urls: vec!["https://explorer.rootstock.io".to_string()],
        });

        // Rootstock Testnet
        self.register(ChainDescriptor {
            chain_id: ROOTSTOCK_TESTNET,
            name: "Rootstock Testnet".to_string(),
            rpc_urls: vec!["https://public-node.testnet.rsk.co".to_string()],
            native_currency: NativeCurrency {
                name: "Test Rootstock BTC".to_string(),
                symbol: "tRBTC".to_string(),
                decimals: 18,
            },
            explorer_urls: vec!["https://explorer.testnet.rootstock.io".to_string()],
        });

        // 本地 Anvil 开发链
        self.register(ChainDescriptor {
            chain_id: LOCAL_DEV,
            name: "Local Anvil".to_string(),
            rpc_urls: vec!["http://localhost:8545".to_string()],
            native_currency: NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            explorer_urls: vec![],
        });
    }

    /// 注册链描述符
    pub fn register(&mut self, descriptor: ChainDescriptor) {
        self.configs.insert(descriptor.chain_id, descriptor);
    }

    /// 通过链ID获取描述符
    pub fn get(&self, chain_id: u64) -> Option<&ChainDescriptor> {
        self.configs.get(&chain_id)
    }

    /// 当前链是否在允许集合内
    pub fn is_allowed(&self, chain_id: u64) -> bool {
        self.allowed.contains(&chain_id)
    }

    /// 协调目标链
    pub fn preferred_target(&self) -> Option<&ChainDescriptor> {
        self.configs.get(&self.preferred_target)
    }

    /// 列出所有已注册的链
    pub fn list_all(&self) -> Vec<&ChainDescriptor> {
        self.configs.values().collect()
    }

    /// 验证链配置完整性
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (chain_id, config) in &self.configs {
            if config.name.is_empty() {
                errors.push(format!("Chain {} has empty name", chain_id));
            }
            if config.rpc_urls.is_empty() {
                errors.push(format!("Chain {} has no rpc urls", config.name));
            }
            if config.native_currency.symbol.is_empty() {
                errors.push(format!("Chain {} has empty currency symbol", config.name));
            }
            if config.native_currency.decimals != 18 {
                // EVM原生币种统一18位小数
                errors.push(format!(
                    "Chain {} has non-standard native decimals: {}",
                    config.name, config.native_currency.decimals
                ));
            }
        }

        // 允许集合里的链必须都有描述符，否则协调时拿不到注册参数
        for allowed in &self.allowed {
            if !self.configs.contains_key(allowed) {
                errors.push(format!("Allowed chain {} has no descriptor", allowed));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_registry_defaults() {
        let registry = ChainRegistry::new();

        let rsk = registry.get(ROOTSTOCK_MAINNET).unwrap();
        assert_eq!(rsk.name, "Rootstock");
        assert_eq!(rsk.native_currency.symbol, "RBTC");

        assert!(registry.is_allowed(ROOTSTOCK_MAINNET));
        assert!(registry.is_allowed(ROOTSTOCK_TESTNET));
        assert!(registry.is_allowed(LOCAL_DEV));
        assert!(!registry.is_allowed(1));

        assert_eq!(registry.preferred_target().unwrap().chain_id, LOCAL_DEV);
        assert!(registry.validate_configs().is_ok());
    }

    #[test]
    fn test_chain_id_hex_roundtrip() {
        assert_eq!(encode_chain_id_hex(31337), "0x7a69");
        assert_eq!(parse_chain_id_hex("0x7A69"), Some(31337));
        assert_eq!(parse_chain_id_hex("0x1e"), Some(30));
        assert_eq!(parse_chain_id_hex("not-hex"), None);
    }

    #[test]
    fn test_registration_params_shape() {
        let registry = ChainRegistry::new();
        let params = registry.get(LOCAL_DEV).unwrap().registration_params();

        assert_eq!(params["chainId"], "0x7a69");
        assert_eq!(params["chainName"], "Local Anvil");
        assert_eq!(params["rpcUrls"][0], "http://localhost:8545");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
    }

    #[test]
    fn test_validate_rejects_missing_descriptor_for_allowed_chain() {
        let mut registry = ChainRegistry::new();
        registry.allowed.push(999);

        let errors = registry.validate_configs().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("999")));
    }
}
