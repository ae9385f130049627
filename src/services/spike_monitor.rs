//! 价格异动监控
//!
//! 定时扫描所有开启监控的群组，读取各自代币在水位之后的新K线，
//! 对涨跌幅达到阈值的每根K线发送一条通知，整批处理成功后才推进水位。
//! 任何一步失败都不推进水位，下一轮会重新处理同一窗口。

use crate::cache::{self, Cache};
use crate::config::{LinkConfig, SpikeMonitorConfig};
use crate::database::MonitorStore;
use crate::services::notifier::{AnimationOptions, Notifier};
use crate::types::*;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rust_decimal::{Decimal, RoundingStrategy};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub struct SpikeMonitor {
    store: Arc<dyn MonitorStore>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<Cache>,
    config: SpikeMonitorConfig,
    links: LinkConfig,
    running: AtomicBool,
    status: Mutex<MonitorStatus>,
}

/// 运行标记的 RAII 守卫，离开作用域（包括取消和 panic）时回到空闲状态
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SpikeMonitor {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<Cache>,
        config: SpikeMonitorConfig,
        links: LinkConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            cache,
            config,
            links,
            running: AtomicBool::new(false),
            status: Mutex::new(MonitorStatus::default()),
        }
    }

    /// 按固定间隔触发检查。每次触发单独 spawn，上一轮未结束时本次触发直接丢弃。
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!(
            "🚀 启动价格异动监控: 间隔 {}s, 阈值 {}%, 周期 {}, 回看 {} 分钟",
            self.config.interval_secs,
            self.config.threshold_percent,
            self.config.timeframe,
            self.config.lookback_minutes
        );

        let mut interval = time::interval(self.config.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let monitor = Arc::clone(&self);
            tokio::spawn(async move {
                monitor.tick(Utc::now()).await;
            });
        }
    }

    /// 执行一轮完整扫描
    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            warn!("⏭️ 上一轮异动检查仍在运行，跳过本次触发");
            self.status.lock().ticks_overlapped += 1;
            return TickOutcome::Overlapped;
        };

        let monitors = match self.load_active_monitors().await {
            Ok(monitors) => monitors,
            Err(e) => {
                error!("❌ 加载活跃监控列表失败: {}", e);
                self.status.lock().ticks_aborted += 1;
                return TickOutcome::Aborted;
            }
        };

        debug!("🔍 本轮检查 {} 个群组", monitors.len());

        // 同一代币的所有群组在任何检查写水位之前共用同一个起点
        let starts: HashMap<&str, DateTime<Utc>> = monitors
            .iter()
            .filter_map(|monitor| monitor.token.as_ref())
            .map(|token| (token.address.as_str(), self.window_start(&token.address, now)))
            .collect();

        let results = join_all(monitors.iter().map(|monitor| {
            let since = monitor
                .token
                .as_ref()
                .and_then(|token| starts.get(token.address.as_str()).copied())
                .unwrap_or_else(|| now - self.config.lookback());
            self.run_check(monitor, since)
        }))
        .await;

        let mut report = TickReport {
            monitors: monitors.len(),
            ..Default::default()
        };

        for (monitor, result) in monitors.iter().zip(results) {
            match result {
                Ok(CheckOutcome::Skipped) => report.skipped += 1,
                Ok(CheckOutcome::NoNewCandles) => report.processed += 1,
                Ok(CheckOutcome::Processed { alerts_sent, .. }) => {
                    report.processed += 1;
                    report.alerts_sent += alerts_sent;
                }
                Err(e) => {
                    report.failed += 1;
                    error!("❌ 群组 {} 异动检查失败，水位保持不变: {}", monitor.config.chat_id, e);
                }
            }
        }

        if report.alerts_sent > 0 || report.failed > 0 {
            info!(
                "📊 异动检查完成: 群组 {}, 处理 {}, 跳过 {}, 失败 {}, 通知 {}",
                report.monitors, report.processed, report.skipped, report.failed, report.alerts_sent
            );
        }

        let mut status = self.status.lock();
        status.ticks_completed += 1;
        status.alerts_sent += report.alerts_sent as u64;
        status.last_tick_at = Some(now);
        status.last_report = Some(report.clone());

        TickOutcome::Completed(report)
    }

    /// 读穿缓存获取开启监控的群组；查询失败时不写缓存
    pub async fn load_active_monitors(&self) -> Result<Vec<ActiveMonitor>> {
        let ttl = Duration::from_secs(self.config.active_monitors_ttl_secs);
        self.cache
            .get_or_fetch(cache::ACTIVE_MONITORS_KEY, Some(ttl), || {
                self.store.find_active_group_configurations()
            })
            .await
    }

    pub fn watermark(&self, token_address: &str) -> Option<DateTime<Utc>> {
        self.cache.get::<DateTime<Utc>>(&cache::watermark_key(token_address))
    }

    fn set_watermark(&self, token_address: &str, timestamp: DateTime<Utc>) {
        self.cache.set_with_ttl(
            cache::watermark_key(token_address),
            timestamp,
            Duration::from_secs(self.config.watermark_ttl_secs),
        );
    }

    /// 水位之后开始；没有水位时回看固定时长
    fn window_start(&self, token_address: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        self.watermark(token_address)
            .unwrap_or_else(|| now - self.config.lookback())
    }

    /// 带超时的单群组检查，超时按失败处理
    async fn run_check(&self, monitor: &ActiveMonitor, since: DateTime<Utc>) -> Result<CheckOutcome> {
        time::timeout(self.config.check_timeout(), self.check_group_since(monitor, since))
            .await
            .map_err(|_| anyhow!("检查超时 ({}s)", self.config.check_timeout_secs))?
    }

    /// 单个群组的异动检查，起点取当前水位
    pub async fn check_group(&self, monitor: &ActiveMonitor, now: DateTime<Utc>) -> Result<CheckOutcome> {
        let since = match &monitor.token {
            Some(token) => self.window_start(&token.address, now),
            None => now - self.config.lookback(),
        };
        self.check_group_since(monitor, since).await
    }

    async fn check_group_since(&self, monitor: &ActiveMonitor, since: DateTime<Utc>) -> Result<CheckOutcome> {
        let config = &monitor.config;
        let token = match &monitor.token {
            Some(token) if config.spike_monitor_enabled => token,
            _ => return Ok(CheckOutcome::Skipped),
        };

        let mut candles: Vec<Candle> = self
            .store
            .find_candles_since(&token.address, &self.config.timeframe, since)
            .await?
            .into_iter()
            .filter(|candle| candle.timestamp > since)
            .collect();

        if candles.is_empty() {
            return Ok(CheckOutcome::NoNewCandles);
        }

        candles.sort_by_key(|candle| candle.timestamp);

        let mut alerts_sent = 0;
        let mut alerts_failed = 0;

        for candle in &candles {
            let Some(change) = candle.change_percent() else {
                if candle.open.is_zero() {
                    debug!("{} 在 {} 的K线开盘价为0，跳过", token.symbol, candle.timestamp);
                } else {
                    warn!(
                        "⚠️ {} 在 {} 的涨跌幅溢出 (open {}, close {})，跳过",
                        token.symbol, candle.timestamp, candle.open, candle.close
                    );
                }
                continue;
            };

            if change.abs() < self.config.threshold_percent {
                continue;
            }

            let alert = self.build_alert(config, token, candle, change);
            match self.dispatch(&alert).await {
                Ok(()) => {
                    alerts_sent += 1;
                    info!(
                        "🚨 已向群组 {} 推送 {} 异动: {:.2}% @ {}",
                        alert.chat_id, alert.token_symbol, alert.change_percent, alert.timestamp
                    );
                }
                Err(e) => {
                    alerts_failed += 1;
                    error!("❌ 向群组 {} 推送 {} 异动失败: {}", alert.chat_id, alert.token_symbol, e);
                }
            }
        }

        let watermark = candles[candles.len() - 1].timestamp;
        self.set_watermark(&token.address, watermark);

        Ok(CheckOutcome::Processed {
            candles: candles.len(),
            alerts_sent,
            alerts_failed,
            watermark,
        })
    }

    fn build_alert(
        &self,
        config: &GroupConfiguration,
        token: &Token,
        candle: &Candle,
        change_percent: Decimal,
    ) -> SpikeAlert {
        let media_url = config
            .spike_monitor_gif_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.config.default_gif_url)
            .to_string();

        SpikeAlert {
            chat_id: config.chat_id,
            thread_id: config.spike_monitor_thread_id,
            media_url,
            token_symbol: token.symbol.clone(),
            token_address: token.address.clone(),
            companion_address: candle.companion_of(&token.address).to_string(),
            timestamp: candle.timestamp,
            change_percent,
            close: candle.close,
            volume: candle.volume,
        }
    }

    async fn dispatch(&self, alert: &SpikeAlert) -> Result<()> {
        let options = AnimationOptions {
            caption: format_alert_caption(alert, &self.links),
            thread_id: alert.thread_id,
        };
        self.notifier
            .send_animation(alert.chat_id, &alert.media_url, options)
            .await
    }

    pub fn status(&self) -> MonitorStatus {
        let mut status = self.status.lock().clone();
        status.running = self.running.load(Ordering::Acquire);
        status
    }
}

/// 异动通知正文（HTML）
pub fn format_alert_caption(alert: &SpikeAlert, links: &LinkConfig) -> String {
    let (icon, sign) = if alert.is_up() { ("🟢", "+") } else { ("🔴", "") };
    let symbol = teloxide::utils::html::escape(&alert.token_symbol);
    let chart_url = links.chart_url(&alert.token_address, &alert.companion_address);
    let swap_url = links.swap_url(&alert.token_address, &alert.companion_address);

    format!(
        "{icon} <b>${symbol} Price Spike!</b>\n\n\
         📈 Change: <b>{sign}{change:.2}%</b>\n\
         💰 Price: <code>{close:.8}</code>\n\
         📊 Volume: <code>{volume:.4}</code>\n\
         🕒 {time}\n\n\
         <a href=\"{chart}\">📉 Chart</a> | <a href=\"{swap}\">🔄 Swap</a>",
        icon = icon,
        symbol = symbol,
        sign = sign,
        change = alert
            .change_percent
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        close = alert.close,
        volume = alert.volume,
        time = alert.timestamp.format("%Y-%m-%d %H:%M UTC"),
        chart = teloxide::utils::html::escape(&chart_url),
        swap = teloxide::utils::html::escape(&swap_url),
    )
}
