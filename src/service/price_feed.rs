//! 价格聚合服务
//!
//! 金价抓取带自动降级：先尝试跨链读取器（主源，带staleness上报），
//! 失败或从未初始化时回落到始终配置的预言机（备用源）。每次抓取
//! 产出全新的`PriceQuote`，带来源与staleness标注

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::providers::Middleware;
use ethers::types::U256;
use tokio::sync::watch;

use crate::domain::contract::names;
use crate::domain::quote::{PriceQuote, PriceSource};
use crate::error::{Result, WalletError};
use crate::gateway::ContractGateway;
use crate::service::session::SignerHandle;

/// 主价格源：跨链读取器，带时间戳和staleness上报
#[async_trait]
pub trait ReaderSource: Send + Sync {
    async fn last_updated(&self) -> Result<u64>;
    async fn is_price_stale(&self) -> Result<bool>;
    async fn price_per_gram(&self) -> Result<U256>;
}

/// 备用价格源：预言机，只有价格值，不暴露时间戳
#[async_trait]
pub trait OracleSource: Send + Sync {
    async fn price_per_gram(&self) -> Result<U256>;
}

/// 读取器合约实现
pub struct ReaderContractSource<M> {
    contract: Contract<M>,
}

impl<M: Middleware + 'static> ReaderContractSource<M> {
    /// 读取器地址未配置（零地址）时返回None，聚合器将只用预言机源
    pub fn new(gateway: &ContractGateway, client: Arc<M>) -> Result<Option<Self>> {
        if !gateway.is_configured(names::GOLD_READER) {
            return Ok(None);
        }
        Ok(Some(Self {
            contract: gateway.resolve(names::GOLD_READER, client)?,
        }))
    }
}

#[async_trait]
impl<M: Middleware + 'static> ReaderSource for ReaderContractSource<M> {
    async fn last_updated(&self) -> Result<u64> {
        let value: U256 = self
            .contract
            .method("lastUpdated", ())
            .map_err(|e| WalletError::rpc(format!("lastUpdated: {}", e)))?
            .call()
            .await
            .map_err(|e| WalletError::rpc(format!("lastUpdated: {}", e)))?;
        Ok(value.as_u64())
    }

    async fn is_price_stale(&self) -> Result<bool> {
        self.contract
            .method("isPriceStale", ())
            .map_err(|e| WalletError::rpc(format!("isPriceStale: {}", e)))?
            .call()
            .await
            .map_err(|e| WalletError::rpc(format!("isPriceStale: {}", e)))
    }

    async fn price_per_gram(&self) -> Result<U256> {
        self.contract
            .method("getGoldPricePerGram", ())
            .map_err(|e| WalletError::rpc(format!("getGoldPricePerGram: {}", e)))?
            .call()
            .await
            .map_err(|e| WalletError::rpc(format!("getGoldPricePerGram: {}", e)))
    }
}

/// 预言机合约实现
pub struct OracleContractSource<M> {
    contract: Contract<M>,
}

impl<M: Middleware + 'static> OracleContractSource<M> {
    pub fn new(gateway: &ContractGateway, client: Arc<M>) -> Result<Self> {
        Ok(Self {
            contract: gateway.resolve(names::GOLD_PRICE_ORACLE, client)?,
        })
    }
}

#[async_trait]
impl<M: Middleware + 'static> OracleSource for OracleContractSource<M> {
    async fn price_per_gram(&self) -> Result<U256> {
        self.contract
            .method("getGoldPricePerGram", ())
            .map_err(|e| WalletError::rpc(format!("getGoldPricePerGram: {}", e)))?
            .call()
            .await
            .map_err(|e| WalletError::rpc(format!("getGoldPricePerGram: {}", e)))
    }
}

pub struct PriceFeedAggregator {
    reader: Option<Arc<dyn ReaderSource>>,
    oracle: Arc<dyn OracleSource>,
}

impl PriceFeedAggregator {
    pub fn new(reader: Option<Arc<dyn ReaderSource>>, oracle: Arc<dyn OracleSource>) -> Self {
        Self { reader, oracle }
    }

    /// 通过合约网关构建两个价格源
    pub fn from_gateway<M: Middleware + 'static>(
        gateway: &ContractGateway,
        client: Arc<M>,
    ) -> Result<Self> {
        let reader = ReaderContractSource::new(gateway, client.clone())?
            .map(|r| Arc::new(r) as Arc<dyn ReaderSource>);
        let oracle: Arc<dyn OracleSource> = Arc::new(OracleContractSource::new(gateway, client)?);
        Ok(Self::new(reader, oracle))
    }

    /// 抓取一份金价报价
    ///
    /// 主源任何失败（包括`lastUpdated == 0`的未初始化状态）都整体
    /// 放弃主源结果并回落到预言机，绝不返回部分结果或零价；备用源
    /// 也失败时以`PriceUnavailable`拒绝，不发明默认报价
    pub async fn fetch_price(&self) -> Result<PriceQuote> {
        if let Some(reader) = &self.reader {
            match self.fetch_from_reader(reader.as_ref()).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    tracing::warn!(error = %e, "Primary price source failed, falling back to oracle")
                }
            }
        }

        self.fetch_from_oracle().await
    }

    async fn fetch_from_reader(&self, reader: &dyn ReaderSource) -> Result<PriceQuote> {
        // 两个子读取并发发出，合流后再继续
        let (last_updated, is_stale) =
            tokio::try_join!(reader.last_updated(), reader.is_price_stale())?;

        // 从未初始化：视为源不可用，绝不上报零价
        if last_updated == 0 {
            return Err(WalletError::rpc("gold reader has no price set"));
        }

        let price = reader.price_per_gram().await?;

        Ok(PriceQuote {
            amount_e8: normalize_amount(price)?,
            source: if is_stale {
                PriceSource::PrimaryStale
            } else {
                PriceSource::PrimaryLive
            },
            // 合约时间戳不可信，换算毫秒时饱和而不回绕
            observed_at_millis: i64::try_from(last_updated)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000),
            is_stale,
        })
    }

    async fn fetch_from_oracle(&self) -> Result<PriceQuote> {
        let price = self.oracle.price_per_gram().await.map_err(|e| {
            tracing::error!(error = %e, "Fallback oracle source failed");
            WalletError::PriceUnavailable
        })?;

        Ok(PriceQuote {
            amount_e8: normalize_amount(price).map_err(|_| WalletError::PriceUnavailable)?,
            source: PriceSource::SecondaryFallback,
            // 预言机不暴露时间戳，观测时间取本地墙钟
            observed_at_millis: Utc::now().timestamp_millis(),
            is_stale: false,
        })
    }

    /// 后台任务：定时抓取金价
    ///
    /// 在途请求不取消也不去重，各自独立完成；watch通道天然是
    /// "最后完成者胜出"——订阅方观察到的是最近一次完成的结果，
    /// 与发出顺序无关。瞬时失败只记日志，等下一轮
    pub fn start_poller(
        self: Arc<Self>,
        interval: Duration,
    ) -> watch::Receiver<Option<PriceQuote>> {
        let (tx, rx) = watch::channel(None);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;

                let aggregator = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    match aggregator.fetch_price().await {
                        Ok(quote) => {
                            tracing::debug!(
                                source = ?quote.source,
                                amount = %quote.amount_display(),
                                "Gold price updated"
                            );
                            let _ = tx.send(Some(quote));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Price fetch failed, will retry next cycle")
                        }
                    }
                });
            }
        });

        rx
    }
}

/// 触发读取器刷新链上金价（状态变更调用，需要签名句柄）
pub async fn update_gold_price(gateway: &ContractGateway, signer: &SignerHandle) -> Result<String> {
    let descriptor = gateway.descriptor(names::GOLD_READER)?;

    let abi: Abi = serde_json::from_str(descriptor.abi_json)
        .map_err(|e| WalletError::configuration(format!("gold reader abi: {}", e)))?;
    let data = abi
        .function("updatePrice")
        .map_err(|e| WalletError::configuration(format!("updatePrice missing from abi: {}", e)))?
        .encode_input(&[])
        .map_err(|e| WalletError::rpc(format!("failed to encode updatePrice call: {}", e)))?;

    signer.send_transaction(descriptor.address, data).await
}

/// 把合约返回的定点价格收窄到u128表示
fn normalize_amount(price: U256) -> Result<u128> {
    if price > U256::from(u128::MAX) {
        return Err(WalletError::rpc(format!("price out of range: {}", price)));
    }
    Ok(price.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_amount_bounds() {
        assert_eq!(normalize_amount(U256::from(2_500_000_000u64)).unwrap(), 2_500_000_000);
        assert_eq!(normalize_amount(U256::from(u128::MAX)).unwrap(), u128::MAX);

        let over = U256::from(u128::MAX) + U256::from(1);
        assert!(normalize_amount(over).is_err());
    }
}
