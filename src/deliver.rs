//! Delivery of finished jobs back to the requesting chat.

use crate::chat::{ChannelService, MessageContext, Reply};
use crate::messages;
use crate::models::{Task, TaskStatusData, TaskType};
use crate::registry::TaskRegistry;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Deliverer {
    registry: Arc<TaskRegistry>,
    channel: Arc<dyn ChannelService>,
    trigger_prefix: String,
}

impl Deliverer {
    pub fn new(
        registry: Arc<TaskRegistry>,
        channel: Arc<dyn ChannelService>,
        trigger_prefix: String,
    ) -> Self {
        Self {
            registry,
            channel,
            trigger_prefix,
        }
    }

    /// Record the result and push the image (plus upscale hint for
    /// generations) to the chat the task came from.
    pub async fn deliver(
        &self,
        task_id: &str,
        data: &TaskStatusData,
        ctx: &MessageContext,
    ) -> Option<Task> {
        let task = self
            .registry
            .complete(task_id, data.img_id.clone(), data.img_url.clone());

        info!(
            "[MJ] task success, task_id={}, img_id={:?}, img_url={:?}",
            task_id, data.img_id, data.img_url
        );

        match &data.img_url {
            Some(url) => self.send(Reply::image_url(url.clone()), ctx).await,
            None => warn!("[MJ] finished task {} carried no image url", task_id),
        }

        match &task {
            Some(task) if task.task_type == TaskType::Generate => {
                let text = self.finished_text(task);
                self.send(Reply::info(text), ctx).await;
            }
            Some(_) => {}
            None => warn!("[MJ] finished task {} is not in the registry", task_id),
        }

        self.registry.log_state();
        self.registry.sweep(Utc::now());
        task
    }

    pub async fn notify_exhausted(&self, task_id: &str, ctx: &MessageContext) {
        let text = messages::render(messages::POLL_EXHAUSTED, &[("task_id", task_id)]);
        self.send(Reply::error(text), ctx).await;
    }

    fn finished_text(&self, task: &Task) -> String {
        messages::render(
            messages::GENERATE_FINISHED,
            &[
                ("prompt", task.raw_prompt.as_deref().unwrap_or_default()),
                ("img_id", task.img_id.as_deref().unwrap_or_default()),
                ("prefix", &self.trigger_prefix),
            ],
        )
    }

    async fn send(&self, reply: Reply, ctx: &MessageContext) {
        if let Err(e) = self.channel.send(reply, ctx).await {
            warn!("[MJ] failed to send reply to {}: {}", ctx.receiver, e);
        }
    }
}
