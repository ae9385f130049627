use super::callbacks::ChartCallback;
use super::{reply, topic_thread_id, BotContext};
use crate::database::CandleOperations;
use crate::services::lookups::CachedLookups;
use crate::services::market_cap::MarketCap;
use crate::types::{percent_change, Candle, Token};
use anyhow::{anyhow, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, MessageId,
    ParseMode, ReplyParameters,
};
use teloxide::utils::markdown::escape;
use teloxide::{ApiError, RequestError};
use tracing::{error, warn};

pub const CHART_CANDLE_LIMIT: i64 = 100;
pub const DEFAULT_CHART_TIMEFRAME: &str = "5m";
const KEYBOARD_TIMEFRAMES: [&str; 3] = ["5m", "1h", "1d"];

pub struct ChartView {
    pub png: Vec<u8>,
    pub caption: String,
    pub keyboard: InlineKeyboardMarkup,
}

pub enum ChartOutcome {
    Ready(ChartView),
    /// 数据不足，附带给用户的提示
    Unavailable(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Updated,
    NotModified,
}

/// 加载K线、渲染图片并组装说明文字
pub async fn build_chart(ctx: &BotContext, token_address: &str, timeframe: &str) -> Result<ChartOutcome> {
    let base_address = &ctx.config.tokens.base_coin_address;
    let Some(base) = CachedLookups::token_by_address(&ctx.db, &ctx.cache, base_address).await? else {
        return Ok(ChartOutcome::Unavailable(
            "SupraCoin not found in database. Please check configuration.".to_string(),
        ));
    };
    let Some(token) = CachedLookups::token_by_address(&ctx.db, &ctx.cache, token_address).await? else {
        return Ok(ChartOutcome::Unavailable(
            "Target token not found. Please provide a valid token address.".to_string(),
        ));
    };

    let candles = CandleOperations::find_recent_for_pair(
        ctx.db.pool(),
        &base.address,
        &token.address,
        timeframe,
        CHART_CANDLE_LIMIT,
    )
    .await?;

    if candles.is_empty() {
        return Ok(ChartOutcome::Unavailable(format!(
            "No OHLC data available for {}/{} in the {} timeframe.",
            token.symbol, base.symbol, timeframe
        )));
    }

    let market = ctx.market_cap.market_cap(&token.address).await;
    let caption = format_chart_caption(&token, &base, &candles, timeframe, &market);
    let keyboard = chart_keyboard(token.id, timeframe);

    let renderer = Arc::clone(&ctx.renderer);
    let png = tokio::task::spawn_blocking(move || renderer.render(&candles))
        .await
        .map_err(|e| anyhow!("图表渲染任务失败: {}", e))??;

    Ok(ChartOutcome::Ready(ChartView { png, caption, keyboard }))
}

/// 发送图表；期间显示加载提示，结束后删除
pub async fn send_chart(bot: &Bot, msg: &Message, ctx: &BotContext, token_address: &str, timeframe: &str) -> Result<()> {
    let loading = reply(bot, msg, "⏳ Loading chart, please wait...").await?;

    let result = match build_chart(ctx, token_address, timeframe).await {
        Ok(ChartOutcome::Ready(view)) => send_photo(bot, msg, view).await,
        Ok(ChartOutcome::Unavailable(reason)) => reply(bot, msg, reason).await.map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = bot.delete_message(msg.chat.id, loading.id).await {
        warn!("删除加载提示失败: {}", e);
    }

    if let Err(e) = result {
        error!("❌ 生成 {} 图表失败: {}", token_address, e);
        reply(bot, msg, "An error occurred while generating the chart.").await?;
    }

    Ok(())
}

async fn send_photo(bot: &Bot, msg: &Message, view: ChartView) -> Result<()> {
    let mut request = bot
        .send_photo(msg.chat.id, InputFile::memory(view.png).file_name("chart.png"))
        .caption(view.caption)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(view.keyboard)
        .reply_parameters(ReplyParameters::new(msg.id));
    if let Some(thread_id) = topic_thread_id(msg) {
        request = request.message_thread_id(thread_id);
    }
    request.await?;
    Ok(())
}

/// 原地替换图表消息
pub async fn edit_chart(bot: &Bot, chat_id: ChatId, message_id: MessageId, view: ChartView) -> Result<EditOutcome> {
    let media = InputMedia::Photo(
        InputMediaPhoto::new(InputFile::memory(view.png).file_name("chart.png"))
            .caption(view.caption)
            .parse_mode(ParseMode::MarkdownV2),
    );

    match bot
        .edit_message_media(chat_id, message_id, media)
        .reply_markup(view.keyboard)
        .await
    {
        Ok(_) => Ok(EditOutcome::Updated),
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(EditOutcome::NotModified),
        Err(e) => Err(e.into()),
    }
}

pub fn chart_keyboard(token_id: i32, timeframe: &str) -> InlineKeyboardMarkup {
    let refresh = ChartCallback::Refresh {
        token_id,
        timeframe: timeframe.to_string(),
    };
    let timeframes = KEYBOARD_TIMEFRAMES
        .iter()
        .map(|tf| {
            let action = ChartCallback::Timeframe {
                token_id,
                timeframe: tf.to_string(),
            };
            InlineKeyboardButton::callback(*tf, action.data())
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🔄 Refresh", refresh.data())],
        timeframes,
    ])
}

/// MarkdownV2 图表说明
pub fn format_chart_caption(
    token: &Token,
    base: &Token,
    candles: &[Candle],
    timeframe: &str,
    market: &MarketCap,
) -> String {
    let (Some(first), Some(latest)) = (candles.first(), candles.last()) else {
        return String::new();
    };

    let current = latest.close;
    let inverse = if current.is_zero() {
        "N/A".to_string()
    } else {
        let dp = if token.decimals > 8 { 8 } else { 3 };
        Decimal::ONE
            .checked_div(current)
            .map(|value| fixed(value, dp))
            .unwrap_or_else(|| "N/A".to_string())
    };
    let change = percent_change(first.open, latest.close).unwrap_or(Decimal::ZERO);
    let trend = if change.is_sign_negative() { "📉" } else { "🚀" };

    let market_cap = market
        .market_cap
        .map(|value| group_thousands(value, 2))
        .unwrap_or_else(|| "0".to_string());
    let supply = market
        .max_supply
        .map(|value| group_thousands(value, 0))
        .unwrap_or_else(|| "0".to_string());

    let token_symbol = escape(&token.symbol);
    let base_symbol = escape(&base.symbol);

    let mut caption = format!("📊 *{} Price Information*\n\n", token_symbol);
    caption += &format!("• 1 {} \\= {} {}\n", base_symbol, escape(&inverse), token_symbol);
    caption += &format!("• 1 {} \\= {} {}\n", token_symbol, escape(&fixed(current, 8)), base_symbol);
    caption += &format!("💹 *Market Cap:* ${}\n", escape(&market_cap));
    caption += &format!("🔢 *Supply:* {}\n\n", escape(&supply));
    caption += "📈 *Price Changes*\n";
    caption += &format!("• {}: {}% {}\n", escape(timeframe), escape(&fixed(change, 2)), trend);
    caption += &format!(
        "⏰ *Last Updated:* {}",
        escape(&latest.timestamp.format("%Y-%m-%d %H:%M UTC").to_string())
    );
    caption
}

fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// 千分位分组
pub fn group_thousands(value: Decimal, dp: u32) -> String {
    let formatted = fixed(value.abs(), dp);
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}
