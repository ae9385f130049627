//! Telegram 命令与回调
//!
//! 命令通过 `BotCommands` 解析后分发到各处理函数，共享依赖统一放在 [`BotContext`] 中，
//! 由 dptree 注入。

pub mod admin;
pub mod callbacks;
pub mod chart;
pub mod commands;

use crate::cache::Cache;
use crate::config::Config;
use crate::database::Database;
use crate::services::chart_renderer::ChartRenderer;
use crate::services::market_cap::MarketCapService;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters, ThreadId};
use teloxide::utils::command::BotCommands;

/// 超过该时长的命令视为积压消息，直接忽略
pub const COMMAND_MAX_AGE_SECS: i64 = 120;

pub struct BotContext {
    pub db: Database,
    pub cache: Arc<Cache>,
    pub config: Config,
    pub market_cap: MarketCapService,
    pub renderer: Arc<dyn ChartRenderer>,
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "可用命令:")]
pub enum Command {
    #[command(description = "welcome message")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "make the bot leave this chat")]
    Quit,
    #[command(description = "price chart for this group's token")]
    Price,
    #[command(description = "SPIKE price chart")]
    Spike,
    #[command(description = "JOSH price chart")]
    Josh,
    #[command(description = "BABYJOSH price chart")]
    BabyJosh,
    #[command(description = "chart for a token: /chart [address] [timeframe]")]
    Chart(String),
    #[command(description = "set the monitored token (group) or your default token (private)")]
    SetToken(String),
    #[command(description = "set your default timeframe: 1m, 5m, 1h, 1d")]
    SetTimeframe(String),
    #[command(description = "toggle the spike monitor")]
    Monitor,
    #[command(description = "set the gif for spike alerts")]
    SetGif(String),
    #[command(rename = "chatid", description = "show this chat's id")]
    ShowChatId,
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(commands::handle),
        )
        .branch(Update::filter_callback_query().endpoint(callbacks::handle))
}

pub fn is_stale(sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - sent_at).num_seconds() > COMMAND_MAX_AGE_SECS
}

/// 论坛话题内的消息返回话题ID，普通消息返回空
pub fn topic_thread_id(msg: &Message) -> Option<ThreadId> {
    if msg.is_topic_message {
        msg.thread_id
    } else {
        None
    }
}

/// 私聊中所有人视为管理员
pub async fn is_admin(bot: &Bot, msg: &Message) -> Result<bool> {
    if msg.chat.is_private() {
        return Ok(true);
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(false);
    };
    let member = bot.get_chat_member(msg.chat.id, user.id).await?;
    Ok(member.is_privileged())
}

/// 在原消息所在话题内回复
pub async fn reply(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<Message> {
    let mut request = bot
        .send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id));
    if let Some(thread_id) = topic_thread_id(msg) {
        request = request.message_thread_id(thread_id);
    }
    Ok(request.await?)
}

pub async fn reply_html(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<Message> {
    let mut request = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html);
    if let Some(thread_id) = topic_thread_id(msg) {
        request = request.message_thread_id(thread_id);
    }
    Ok(request.await?)
}
