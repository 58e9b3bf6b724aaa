//! Job submission: starts remote jobs, registers them and hands them to the
//! poller. Callers always get a provisional reply right away.

use crate::api::MidjourneyService;
use crate::chat::{MessageContext, Reply};
use crate::messages;
use crate::models::{Task, TaskType};
use crate::poller::{PollHandle, Poller};
use crate::registry::TaskRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const INVALID_IMAGE_STATUS: u16 = 461;

/// Immediate reply for a submission plus the poll job it started, if any.
pub struct Submission {
    pub reply: Reply,
    pub job: Option<PollHandle>,
}

impl Submission {
    fn rejected(reply: Reply) -> Self {
        Self { reply, job: None }
    }
}

pub struct MidjourneyBot {
    api: Arc<dyn MidjourneyService>,
    registry: Arc<TaskRegistry>,
    poller: Poller,
    task_expiry: Duration,
}

impl MidjourneyBot {
    pub fn new(
        api: Arc<dyn MidjourneyService>,
        registry: Arc<TaskRegistry>,
        poller: Poller,
        task_expiry: Duration,
    ) -> Self {
        Self {
            api,
            registry,
            poller,
            task_expiry,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub async fn generate(&self, prompt: &str, ctx: &MessageContext) -> Submission {
        info!("[MJ] image generate, prompt={}", prompt);

        let data = match self.api.generate(prompt).await {
            Ok(data) => data,
            Err(e) => {
                error!(
                    "[MJ] generate error, msg={}, status_code={:?}",
                    e,
                    e.remote_status()
                );
                return Submission::rejected(Reply::error(messages::GENERATE_FAILED));
            }
        };

        let mut content = messages::GENERATE_ACCEPTED.to_string();
        match data.real_prompt.as_deref().filter(|p| !p.is_empty()) {
            Some(real_prompt) => content.push_str(&messages::render(
                messages::PROMPT_REWRITTEN,
                &[("prompt", prompt), ("real_prompt", real_prompt)],
            )),
            None => content.push_str(&messages::render(
                messages::PROMPT_ONLY,
                &[("prompt", prompt)],
            )),
        }

        let task = Task::new(
            data.task_id,
            ctx.session_id.clone(),
            TaskType::Generate,
            Some(prompt.to_string()),
            self.task_expiry,
        );

        Submission {
            reply: Reply::info(content),
            job: self.track(task, ctx),
        }
    }

    pub async fn upscale(&self, img_id: &str, index: u8, ctx: &MessageContext) -> Submission {
        // Claimed before the remote call, released again if it fails.
        let key = TaskType::Upscale.operation_key(img_id, index);
        if !self.registry.mark_operated(key.clone()) {
            return Submission::rejected(Reply::error(messages::render(
                messages::ALREADY_UPSCALED,
                &[("index", &index.to_string())],
            )));
        }
        info!("[MJ] image upscale, img_id={}, index={}", img_id, index);

        let data = match self.api.upscale(img_id, index).await {
            Ok(data) => data,
            Err(e) => {
                self.registry.unmark_operated(&key);
                let status = e.remote_status();
                error!("[MJ] upscale error, msg={}, status_code={:?}", e, status);
                let text = if status == Some(INVALID_IMAGE_STATUS) {
                    messages::INVALID_IMAGE_ID
                } else {
                    messages::GENERATE_FAILED
                };
                return Submission::rejected(Reply::error(text));
            }
        };

        let task = Task::new(
            data.task_id,
            ctx.session_id.clone(),
            TaskType::Upscale,
            None,
            self.task_expiry,
        );
        Submission {
            reply: Reply::info(messages::UPSCALE_ACCEPTED),
            job: self.track(task, ctx),
        }
    }

    fn track(&self, task: Task, ctx: &MessageContext) -> Option<PollHandle> {
        let task_id = task.id.clone();
        if !self.registry.register(task) {
            return None;
        }
        Some(self.poller.schedule(task_id, ctx.clone()))
    }
}
