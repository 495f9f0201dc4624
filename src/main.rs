//! GoldCore 守护进程入口
//!
//! 加载配置、初始化日志，对配置的RPC端点建立价格轮询并输出报价；
//! 同时演示会话恢复查询（只上报可用性，不自动连接）

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers::providers::{Http, Provider};

use goldcore::config::Config;
use goldcore::domain::chain::ChainRegistry;
use goldcore::gateway::ContractGateway;
use goldcore::infrastructure::logging;
use goldcore::provider::RpcWalletProvider;
use goldcore::service::{PriceFeedAggregator, SessionManager};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("failed to load configuration")?;
    let _log_guard = logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::info!(rpc = %config.network.rpc_url, "GoldCore starting");

    let registry = Arc::new(ChainRegistry::new());
    if let Err(errors) = registry.validate_configs() {
        for error in &errors {
            tracing::error!(%error, "Invalid chain configuration");
        }
        anyhow::bail!("chain configuration validation failed");
    }

    // 会话演示：查询已授权账户，连接决定权留给上层
    let wallet = Arc::new(RpcWalletProvider::new(config.network.rpc_url.clone()));
    let sessions = Arc::new(SessionManager::new(Some(wallet), registry));
    match sessions.restore_if_authorized().await {
        Ok(accounts) if accounts.is_empty() => {
            tracing::info!("No previously authorized accounts")
        }
        Ok(accounts) => tracing::info!(count = accounts.len(), "Authorized accounts available"),
        Err(e) => tracing::warn!(error = %e, "Failed to query authorized accounts"),
    }

    // 价格轮询
    let read_provider = Arc::new(
        Provider::<Http>::try_from(config.network.rpc_url.as_str())
            .context("invalid rpc url")?,
    );
    let gateway = ContractGateway::from_config(&config.contracts)
        .map_err(|e| anyhow::anyhow!("gateway configuration: {}", e))?;
    let aggregator = Arc::new(
        PriceFeedAggregator::from_gateway(&gateway, read_provider)
            .map_err(|e| anyhow::anyhow!("price feed configuration: {}", e))?,
    );

    let mut quotes =
        aggregator.start_poller(Duration::from_secs(config.polling.price_interval_secs));

    loop {
        quotes
            .changed()
            .await
            .context("price poller channel closed")?;
        if let Some(quote) = quotes.borrow_and_update().clone() {
            tracing::info!(
                amount = %quote.amount_display(),
                usd = %quote.usd_display(),
                source = ?quote.source,
                stale = quote.is_stale,
                observed_at = quote.observed_at_millis,
                "Gold price per gram"
            );
        }
    }
}
