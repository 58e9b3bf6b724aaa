use super::{ChannelService, MessageContext, Reply, ReplyType};
use crate::Result;
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Channel that prints replies to stdout, used by the console host.
pub struct ConsoleChannel {
    out: Mutex<Stdout>,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }

    pub fn format_reply(reply: &Reply, ctx: &MessageContext) -> String {
        let label = match reply.reply_type {
            ReplyType::Text => "text",
            ReplyType::Error => "error",
            ReplyType::Info => "info",
            ReplyType::ImageUrl => "image",
        };
        format!("[{} -> {}] {}\n", label, ctx.receiver, reply.content)
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelService for ConsoleChannel {
    async fn send(&self, reply: Reply, ctx: &MessageContext) -> Result<()> {
        let line = Self::format_reply(&reply, ctx);
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
