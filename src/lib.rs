//! GoldCore - 黄金锚定代币客户端集成核心
//!
//! 钱包会话生命周期管理（账户/网络变更）与双源金价聚合（主备降级、
//! staleness检测）。页面展示、路由和链上合约本身都是外部协作方

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod infrastructure;
pub mod provider;
pub mod service;

pub use error::{Result, WalletError};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{ChainDescriptor, ChainRegistry, PriceQuote, PriceSource},
        error::{Result, WalletError},
        gateway::ContractGateway,
        provider::{ProviderEvent, WalletProvider},
        service::{PriceFeedAggregator, Session, SessionManager, SessionStatus},
    };
}
