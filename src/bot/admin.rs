use super::{is_admin, reply, topic_thread_id, BotContext};
use crate::database::{GroupOperations, PreferenceOperations};
use crate::services::lookups::CachedLookups;
use crate::types::{is_supported_timeframe, UpdateUserPreference, SUPPORTED_TIMEFRAMES};
use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;

const GROUP_ONLY: &str = "This command only works in groups.";
const NOT_ADMIN: &str = "You do not have permission to execute this command.";

/// 群组内且发送者为管理员时返回 true，否则回复原因
async fn ensure_group_admin(bot: &Bot, msg: &Message) -> Result<bool> {
    if msg.chat.is_private() {
        reply(bot, msg, GROUP_ONLY).await?;
        return Ok(false);
    }
    if !is_admin(bot, msg).await? {
        reply(bot, msg, NOT_ADMIN).await?;
        return Ok(false);
    }
    Ok(true)
}

/// 群组中设置监控代币，私聊中设置个人默认代币
pub async fn set_token(bot: &Bot, msg: &Message, ctx: &BotContext, address: &str) -> Result<()> {
    if address.is_empty() {
        reply(bot, msg, "Please specify a token address. Example: /settoken 0x123...").await?;
        return Ok(());
    }

    if msg.chat.is_private() {
        return set_default_token(bot, msg, ctx, address).await;
    }

    if !ensure_group_admin(bot, msg).await? {
        return Ok(());
    }

    let Some(token) = CachedLookups::token_by_address(&ctx.db, &ctx.cache, address).await? else {
        reply(bot, msg, format!("No token found with the address {}.", address)).await?;
        return Ok(());
    };

    let chat_id = msg.chat.id.0;
    GroupOperations::set_monitor_token(ctx.db.pool(), chat_id, token.id).await?;
    CachedLookups::invalidate_group(&ctx.cache, chat_id);
    info!("🎯 群组 {} 监控代币设置为 {} ({})", chat_id, token.symbol, token.address);

    reply(
        bot,
        msg,
        format!(
            "The token for the spike monitor has been set to: {} ({})",
            token.symbol, token.address
        ),
    )
    .await?;
    Ok(())
}

async fn set_default_token(bot: &Bot, msg: &Message, ctx: &BotContext, address: &str) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(token) = CachedLookups::token_by_address(&ctx.db, &ctx.cache, address).await? else {
        reply(bot, msg, "Token not found. Please provide a valid token address.").await?;
        return Ok(());
    };

    let update = UpdateUserPreference {
        default_token_address: Some(token.address.clone()),
        ..Default::default()
    };
    PreferenceOperations::set_user_preference(ctx.db.pool(), user.id.0 as i64, &update).await?;

    reply(bot, msg, format!("Default token set to {} ({}).", token.symbol, token.address)).await?;
    Ok(())
}

pub async fn set_timeframe(bot: &Bot, msg: &Message, ctx: &BotContext, timeframe: &str) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !is_admin(bot, msg).await? {
        reply(bot, msg, "Sorry, only admins can use this command.").await?;
        return Ok(());
    }
    if timeframe.is_empty() {
        reply(bot, msg, "Usage: /settimeframe <timeframe> (e.g., 1m, 5m, 1h)").await?;
        return Ok(());
    }
    if !is_supported_timeframe(timeframe) {
        reply(
            bot,
            msg,
            format!("Invalid timeframe. Please use one of: {}", SUPPORTED_TIMEFRAMES.join(", ")),
        )
        .await?;
        return Ok(());
    }

    let update = UpdateUserPreference {
        default_timeframe: Some(timeframe.to_string()),
        ..Default::default()
    };
    PreferenceOperations::set_user_preference(ctx.db.pool(), user.id.0 as i64, &update).await?;

    reply(bot, msg, format!("Default timeframe set to {}.", timeframe)).await?;
    Ok(())
}

/// 切换监控开关；开启时绑定到当前话题
pub async fn toggle_monitor(bot: &Bot, msg: &Message, ctx: &BotContext) -> Result<()> {
    if !ensure_group_admin(bot, msg).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    let thread_id = topic_thread_id(msg).map(|thread| thread.0 .0);
    let config = GroupOperations::toggle_monitor(ctx.db.pool(), chat_id, thread_id).await?;
    CachedLookups::invalidate_group(&ctx.cache, chat_id);

    let status = match (config.spike_monitor_enabled, config.spike_monitor_thread_id) {
        (true, Some(_)) => "Enabled in this thread",
        (true, None) => "Enabled",
        (false, _) => "Disabled",
    };
    info!("🔔 群组 {} 异动监控: {}", chat_id, status);

    reply(bot, msg, format!("The spike monitor has been {}.", status)).await?;
    Ok(())
}

pub async fn set_gif(bot: &Bot, msg: &Message, ctx: &BotContext, gif_url: &str) -> Result<()> {
    if !ensure_group_admin(bot, msg).await? {
        return Ok(());
    }
    if gif_url.is_empty() {
        reply(bot, msg, "Please specify a GIF URL. Example: /setgif https://example.com/my.gif").await?;
        return Ok(());
    }
    if url::Url::parse(gif_url).is_err() {
        reply(bot, msg, "That does not look like a valid URL.").await?;
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    GroupOperations::set_gif_url(ctx.db.pool(), chat_id, gif_url).await?;
    CachedLookups::invalidate_group(&ctx.cache, chat_id);

    reply(bot, msg, "The GIF for spike notifications has been set.").await?;
    Ok(())
}

pub async fn chat_id(bot: &Bot, msg: &Message) -> Result<()> {
    if !ensure_group_admin(bot, msg).await? {
        return Ok(());
    }
    reply(bot, msg, format!("The ID of this chat is: {}", msg.chat.id)).await?;
    Ok(())
}
