//! Chat command handling
//!
//! Recognizes `{prefix}mj <prompt>` and `{prefix}mju <img_id> <index>`,
//! validates arguments and forwards valid requests to [`MidjourneyBot`].

use crate::bot::MidjourneyBot;
use crate::chat::{ContextKind, EventOutcome, MessageContext, Reply};
use crate::messages;
use crate::models::TaskType;
use std::sync::Arc;
use tracing::debug;

const MIN_INDEX: i64 = 1;
const MAX_INDEX: i64 = 4;

pub struct CommandDispatcher {
    bot: Arc<MidjourneyBot>,
    enabled: bool,
    trigger_prefix: String,
}

impl CommandDispatcher {
    pub fn new(bot: Arc<MidjourneyBot>, enabled: bool, trigger_prefix: String) -> Self {
        Self {
            bot,
            enabled,
            trigger_prefix,
        }
    }

    /// Entry point for every incoming message.
    pub async fn handle(&self, ctx: &MessageContext) -> EventOutcome {
        match self.classify(ctx) {
            Some(task_type) => {
                let reply = self.process(task_type, ctx).await;
                EventOutcome::handled(reply)
            }
            None => EventOutcome::pass_through(),
        }
    }

    /// Which job a message asks for, if it is addressed to this plugin at all.
    pub fn classify(&self, ctx: &MessageContext) -> Option<TaskType> {
        if !self.enabled || ctx.kind != ContextKind::Text {
            return None;
        }

        let command = ctx.content.split_whitespace().next()?.to_lowercase();
        let generate = format!("{}mj", self.trigger_prefix).to_lowercase();
        let upscale = format!("{}mju", self.trigger_prefix).to_lowercase();

        if command == generate {
            Some(TaskType::Generate)
        } else if command == upscale {
            Some(TaskType::Upscale)
        } else {
            None
        }
    }

    pub async fn process(&self, task_type: TaskType, ctx: &MessageContext) -> Reply {
        let content = ctx.content.trim();
        let (command, args) = match content.split_once(char::is_whitespace) {
            Some((command, args)) if !args.trim().is_empty() => (command, args.trim()),
            _ => return Reply::error(self.help_text(true)),
        };

        match task_type {
            TaskType::Generate => self.bot.generate(args, ctx).await.reply,
            TaskType::Upscale => self.process_upscale(command, args, ctx).await,
            TaskType::Variation | TaskType::Reset => {
                debug!("[MJ] unsupported command type {}", task_type);
                Reply::error(messages::UNSUPPORTED_COMMAND)
            }
        }
    }

    async fn process_upscale(&self, command: &str, args: &str, ctx: &MessageContext) -> Reply {
        let mut tokens = args.split_whitespace();
        let (Some(img_id), Some(raw_index)) = (tokens.next(), tokens.next()) else {
            return Reply::error(messages::render(
                messages::MISSING_PARAMETERS,
                &[("cmd", command)],
            ));
        };

        let Some(index) = parse_index(raw_index) else {
            return Reply::error(messages::render(
                messages::INDEX_OUT_OF_RANGE,
                &[("index", raw_index)],
            ));
        };

        self.bot.upscale(img_id, index, ctx).await.reply
    }

    pub fn help_text(&self, verbose: bool) -> String {
        let mut text = messages::HELP_SHORT.to_string();
        if verbose {
            text.push_str(&messages::render(
                messages::HELP_VERBOSE,
                &[("prefix", &self.trigger_prefix)],
            ));
        }
        text
    }
}

fn parse_index(raw: &str) -> Option<u8> {
    let index: i64 = raw.parse().ok()?;
    if (MIN_INDEX..=MAX_INDEX).contains(&index) {
        u8::try_from(index).ok()
    } else {
        None
    }
}
