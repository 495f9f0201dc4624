//! 服务层模块

pub mod network;
pub mod price_feed;
pub mod session;

pub use network::{ChainOutcome, NetworkReconciler};
pub use price_feed::PriceFeedAggregator;
pub use session::{Session, SessionManager, SessionStatus};
