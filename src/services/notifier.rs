use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode, ThreadId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationOptions {
    pub caption: String,
    pub thread_id: Option<i32>,
}

/// 消息发送协作方
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_animation(&self, chat_id: i64, media_url: &str, options: AnimationOptions) -> Result<()>;
}

pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_animation(&self, chat_id: i64, media_url: &str, options: AnimationOptions) -> Result<()> {
        let url = url::Url::parse(media_url)?;

        let mut request = self
            .bot
            .send_animation(ChatId(chat_id), InputFile::url(url))
            .caption(options.caption)
            .parse_mode(ParseMode::Html);

        if let Some(thread_id) = options.thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread_id)));
        }

        request.await?;
        Ok(())
    }
}
