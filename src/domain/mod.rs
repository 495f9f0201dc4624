//! 领域类型模块

pub mod chain;
pub mod contract;
pub mod quote;

pub use chain::{ChainDescriptor, ChainRegistry, NativeCurrency};
pub use contract::ContractDescriptor;
pub use quote::{PriceQuote, PriceSource};
