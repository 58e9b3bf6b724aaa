//! Chat framework collaborators
//!
//! The host framework owns routing and channels; the plugin only sees an
//! incoming message, produces replies, and pushes late replies through a
//! [`ChannelService`].

pub mod console;
pub mod mock;

pub use console::ConsoleChannel;
pub use mock::MockChannel;

use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Text,
    Image,
    Voice,
    Other,
}

/// An incoming chat message as handed to the plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageContext {
    pub kind: ContextKind,
    pub content: String,
    pub session_id: String,
    /// Where the channel should route late replies.
    pub receiver: String,
}

impl MessageContext {
    pub fn text(content: impl Into<String>, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            kind: ContextKind::Text,
            content: content.into(),
            receiver: session_id.clone(),
            session_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyType {
    Text,
    Error,
    Info,
    ImageUrl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub reply_type: ReplyType,
    pub content: String,
}

impl Reply {
    pub fn new(reply_type: ReplyType, content: impl Into<String>) -> Self {
        Self {
            reply_type,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(ReplyType::Error, content)
    }

    pub fn info(content: impl Into<String>) -> Self {
        Self::new(ReplyType::Info, content)
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::new(ReplyType::ImageUrl, url)
    }
}

/// What the host should do after the plugin looked at a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Continue,
    Break,
    BreakPass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    pub action: EventAction,
    pub reply: Option<Reply>,
}

impl EventOutcome {
    pub fn pass_through() -> Self {
        Self {
            action: EventAction::Continue,
            reply: None,
        }
    }

    pub fn handled(reply: Reply) -> Self {
        Self {
            action: EventAction::BreakPass,
            reply: Some(reply),
        }
    }
}

#[async_trait]
pub trait ChannelService: Send + Sync {
    async fn send(&self, reply: Reply, ctx: &MessageContext) -> Result<()>;
}
