use crate::bot::{self, BotContext, Command};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

pub struct BotService {
    bot: Bot,
    context: Arc<BotContext>,
}

impl BotService {
    pub fn new(bot: Bot, context: Arc<BotContext>) -> Self {
        Self { bot, context }
    }

    pub async fn start(self) -> Result<()> {
        info!("🚀 启动Telegram机器人...");

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("注册命令菜单失败: {}", e);
        }

        Dispatcher::builder(self.bot, bot::schema())
            .dependencies(dptree::deps![self.context])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram机器人已停止");
        Ok(())
    }
}
