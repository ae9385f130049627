use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{GroupConfiguration, Token};

/// 已开启监控的群组配置及其关联代币
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMonitor {
    pub config: GroupConfiguration,
    pub token: Option<Token>,
}

/// 单根K线触发的异动通知内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeAlert {
    pub chat_id: i64,
    pub thread_id: Option<i32>,
    pub media_url: String,
    pub token_symbol: String,
    pub token_address: String,
    pub companion_address: String,
    pub timestamp: DateTime<Utc>,
    pub change_percent: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl SpikeAlert {
    pub fn is_up(&self) -> bool {
        !self.change_percent.is_sign_negative()
    }
}

/// 单个群组一次检查的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    /// 未开启或未配置代币
    Skipped,
    /// 水位之后没有新K线
    NoNewCandles,
    Processed {
        candles: usize,
        alerts_sent: usize,
        alerts_failed: usize,
        watermark: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub monitors: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub alerts_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    Completed(TickReport),
    /// 上一轮仍在运行，本次触发被丢弃
    Overlapped,
    /// 加载监控列表失败，本轮放弃
    Aborted,
}

/// 对外暴露的监控运行状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub ticks_completed: u64,
    pub ticks_overlapped: u64,
    pub ticks_aborted: u64,
    pub alerts_sent: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_report: Option<TickReport>,
}
