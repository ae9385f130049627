use super::chart::{send_chart, DEFAULT_CHART_TIMEFRAME};
use super::{admin, is_stale, reply, reply_html, BotContext, Command};
use crate::database::PreferenceOperations;
use crate::services::lookups::CachedLookups;
use crate::types::{is_supported_timeframe, SUPPORTED_TIMEFRAMES};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

const WELCOME_TEXT: &str = "Welcome to the Price Bot! 🚀\n\nUse /help to see all available commands.";

const HELP_TEXT: &str = "<b>🤖 General Commands</b>\n\n\
/start - Initializes the bot and shows a welcome message.\n\
/help - Displays this help message.\n\
/price - Shows the price chart for the token configured for this group.\n\
/chart [address] [timeframe] - Shows a price chart, falling back to your saved defaults.\n\
/spike - Shortcut to show the price chart for the SPIKE token.\n\
/josh - Shortcut to show the price chart for the JOSH token.\n\
/babyjosh - Shortcut to show the price chart for the BABYJOSH token.\n\
/settimeframe &lt;tf&gt; - Sets your default chart timeframe (1m, 5m, 1h, 1d).\n\n\
<b>🛠️ Admin Commands</b>\n\n\
/monitor - Toggles the price spike monitor ON or OFF. When turning ON, alerts will be posted in the thread where the command is used.\n\
/settoken &lt;address&gt; - Sets the token for the /price command and the spike monitor.\n\
/setgif &lt;url&gt; - Sets a custom GIF for spike alert notifications.\n\
/chatid - Shows the ID of this chat.\n\
/quit - Commands the bot to leave the chat.";

pub async fn handle(bot: Bot, msg: Message, cmd: Command, ctx: Arc<BotContext>) -> Result<()> {
    debug!("收到命令 {:?} 来自 chat {}", cmd, msg.chat.id);

    let result = match cmd {
        Command::Start => reply(&bot, &msg, WELCOME_TEXT).await.map(|_| ()),
        Command::Help => help(&bot, &msg).await,
        Command::Quit => quit(&bot, &msg).await,
        Command::Price => price(&bot, &msg, &ctx).await,
        Command::Spike => shortcut(&bot, &msg, &ctx, ctx.config.tokens.spike_token_address.as_deref(), "SPIKE").await,
        Command::Josh => shortcut(&bot, &msg, &ctx, ctx.config.tokens.josh_token_address.as_deref(), "JOSH").await,
        Command::BabyJosh => {
            shortcut(&bot, &msg, &ctx, ctx.config.tokens.babyjosh_token_address.as_deref(), "BABYJOSH").await
        }
        Command::Chart(args) => chart(&bot, &msg, &ctx, &args).await,
        Command::SetToken(address) => admin::set_token(&bot, &msg, &ctx, address.trim()).await,
        Command::SetTimeframe(timeframe) => admin::set_timeframe(&bot, &msg, &ctx, timeframe.trim()).await,
        Command::Monitor => admin::toggle_monitor(&bot, &msg, &ctx).await,
        Command::SetGif(url) => admin::set_gif(&bot, &msg, &ctx, url.trim()).await,
        Command::ShowChatId => admin::chat_id(&bot, &msg).await,
    };

    if let Err(e) = result {
        error!("❌ 处理命令失败 chat {}: {}", msg.chat.id, e);
        reply(&bot, &msg, "An error occurred while processing the command.").await?;
    }

    Ok(())
}

async fn help(bot: &Bot, msg: &Message) -> Result<()> {
    if is_stale(msg.date, Utc::now()) {
        return Ok(());
    }
    reply_html(bot, msg, HELP_TEXT).await?;
    Ok(())
}

async fn quit(bot: &Bot, msg: &Message) -> Result<()> {
    bot.leave_chat(msg.chat.id).await?;
    Ok(())
}

async fn price(bot: &Bot, msg: &Message, ctx: &BotContext) -> Result<()> {
    if msg.chat.is_private() {
        reply(bot, msg, "This command only works in groups.").await?;
        return Ok(());
    }

    let group = CachedLookups::group_configuration(&ctx.db, &ctx.cache, msg.chat.id.0).await?;
    match group.and_then(|group| group.token) {
        Some(token) => send_chart(bot, msg, ctx, &token.address, DEFAULT_CHART_TIMEFRAME).await,
        None => {
            reply(
                bot,
                msg,
                "No token has been configured for this group. An admin can set one with /settoken <token_address>",
            )
            .await?;
            Ok(())
        }
    }
}

async fn shortcut(bot: &Bot, msg: &Message, ctx: &BotContext, address: Option<&str>, symbol: &str) -> Result<()> {
    if is_stale(msg.date, Utc::now()) {
        return Ok(());
    }
    match address {
        Some(address) => send_chart(bot, msg, ctx, address, DEFAULT_CHART_TIMEFRAME).await,
        None => {
            reply(bot, msg, format!("The {} token is not configured.", symbol)).await?;
            Ok(())
        }
    }
}

async fn chart(bot: &Bot, msg: &Message, ctx: &BotContext, args: &str) -> Result<()> {
    if is_stale(msg.date, Utc::now()) {
        return Ok(());
    }

    let preference = match msg.from.as_ref() {
        Some(user) => PreferenceOperations::get_user_preference(ctx.db.pool(), user.id.0 as i64).await?,
        None => None,
    };
    let request = ChartRequest::resolve(
        args,
        preference.as_ref().and_then(|p| p.default_token_address.as_deref()),
        preference.as_ref().and_then(|p| p.default_timeframe.as_deref()),
        ctx.config.tokens.spike_token_address.as_deref(),
    );

    let Some(request) = request else {
        reply(bot, msg, "Usage: /chart <token_address> [timeframe]").await?;
        return Ok(());
    };

    if !is_supported_timeframe(&request.timeframe) {
        reply(
            bot,
            msg,
            format!("Invalid timeframe. Please use one of: {}", SUPPORTED_TIMEFRAMES.join(", ")),
        )
        .await?;
        return Ok(());
    }

    send_chart(bot, msg, ctx, &request.token_address, &request.timeframe).await
}

/// `/chart` 参数解析结果：显式参数优先，其次用户偏好，最后是默认代币与周期
#[derive(Debug, PartialEq, Eq)]
pub struct ChartRequest {
    pub token_address: String,
    pub timeframe: String,
}

impl ChartRequest {
    pub fn resolve(
        args: &str,
        preferred_token: Option<&str>,
        preferred_timeframe: Option<&str>,
        default_token: Option<&str>,
    ) -> Option<Self> {
        let mut parts = args.split_whitespace();
        let token_address = parts.next().or(preferred_token).or(default_token)?;
        let timeframe = parts
            .next()
            .or(preferred_timeframe)
            .unwrap_or(DEFAULT_CHART_TIMEFRAME);

        Some(Self {
            token_address: token_address.to_string(),
            timeframe: timeframe.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_arguments_win() {
        let request = ChartRequest::resolve("0xabc 1h", Some("0xpref"), Some("1d"), Some("0xspike")).unwrap();
        assert_eq!(request.token_address, "0xabc");
        assert_eq!(request.timeframe, "1h");
    }

    #[test]
    fn test_falls_back_to_preferences() {
        let request = ChartRequest::resolve("", Some("0xpref"), Some("1d"), Some("0xspike")).unwrap();
        assert_eq!(request.token_address, "0xpref");
        assert_eq!(request.timeframe, "1d");
    }

    #[test]
    fn test_falls_back_to_defaults() {
        let request = ChartRequest::resolve("  ", None, None, Some("0xspike")).unwrap();
        assert_eq!(request.token_address, "0xspike");
        assert_eq!(request.timeframe, "5m");
    }

    #[test]
    fn test_no_token_anywhere() {
        assert_eq!(ChartRequest::resolve("", None, Some("1h"), None), None);
    }
}
