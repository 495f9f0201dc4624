//! 价格报价模块
//!
//! 每次抓取生成一份全新的报价，绝不原地修改；下一次抓取的结果
//! 整体替换上一份。金额内部始终是10^8定点整数，2位小数的美元
//! 格式只在展示层使用，不回写定点值

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 定点价格的小数位数
pub const PRICE_DECIMALS: u32 = 8;

/// 报价来源标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    /// 主源（读取器），staleness上报为新鲜
    PrimaryLive,
    /// 主源（读取器），staleness上报为过期
    PrimaryStale,
    /// 备用预言机源（不提供时间戳）
    SecondaryFallback,
}

/// 每克黄金价格报价
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// 每克价格，10^8定点整数
    pub amount_e8: u128,
    pub source: PriceSource,
    /// 观测时间（毫秒）：主源为合约上报的lastUpdated*1000，备用源为本地墙钟
    pub observed_at_millis: i64,
    pub is_stale: bool,
}

impl PriceQuote {
    /// 8位小数的完整定点展示（"25.00000000"）
    pub fn amount_display(&self) -> String {
        match decimal_from_e8(self.amount_e8) {
            Some(d) => d.to_string(),
            // 超出Decimal表示范围时退回原始整数
            None => format!("{}e-8", self.amount_e8),
        }
    }

    /// 2位小数的美元展示（"$25.00"），仅用于表现层
    pub fn usd_display(&self) -> String {
        match decimal_from_e8(self.amount_e8) {
            Some(d) => format!("${}", d.round_dp(2)),
            None => format!("${}e-8", self.amount_e8),
        }
    }
}

fn decimal_from_e8(amount: u128) -> Option<Decimal> {
    let signed = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(signed, PRICE_DECIMALS).ok()
}
