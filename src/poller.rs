//! Background polling of submitted jobs
//!
//! Every submitted job gets one poll future spawned onto a shared runtime
//! (normally the dedicated [`BackgroundLoop`]). The future spends a retry
//! budget on status checks until the job finishes or the budget runs out.

use crate::api::MidjourneyService;
use crate::chat::MessageContext;
use crate::deliver::Deliverer;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const POLL_THREAD_NAME: &str = "mj-check-thread";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Units available to one job; every check costs one.
    pub budget: u32,
    pub interval: Duration,
    /// Extra units charged when a status check fails.
    pub error_penalty: u32,
    pub notify_on_exhaustion: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            budget: 80,
            interval: Duration::from_secs(10),
            error_penalty: 20,
            notify_on_exhaustion: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Finished { attempts: u32, remaining_budget: i64 },
    Exhausted { attempts: u32 },
}

/// Completion handle of one poll job.
pub struct PollHandle(JoinHandle<PollOutcome>);

impl PollHandle {
    pub async fn outcome(self) -> Result<PollOutcome> {
        self.0
            .await
            .map_err(|e| Error::Generic(format!("poll job failed: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

/// Dedicated single-worker runtime all poll jobs are multiplexed on.
pub struct BackgroundLoop {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl BackgroundLoop {
    pub fn start() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(POLL_THREAD_NAME)
            .enable_all()
            .build()?;
        info!("[MJ] started background poll loop on {}", POLL_THREAD_NAME);

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

impl Drop for BackgroundLoop {
    fn drop(&mut self) {
        // shutdown_background is the only shutdown that is safe from async contexts.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn MidjourneyService>,
    deliverer: Arc<Deliverer>,
    settings: PollSettings,
    handle: Handle,
}

impl Poller {
    pub fn new(
        api: Arc<dyn MidjourneyService>,
        deliverer: Arc<Deliverer>,
        settings: PollSettings,
        handle: Handle,
    ) -> Self {
        Self {
            api,
            deliverer,
            settings,
            handle,
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Hand a job over to the background runtime. Never blocks the caller.
    pub fn schedule(&self, task_id: String, ctx: MessageContext) -> PollHandle {
        let poller = self.clone();
        PollHandle(
            self.handle
                .spawn(async move { poller.run(&task_id, &ctx).await }),
        )
    }

    pub async fn run(&self, task_id: &str, ctx: &MessageContext) -> PollOutcome {
        let mut budget = i64::from(self.settings.budget);
        let mut attempts = 0;

        while budget > 0 {
            attempts += 1;
            match self.api.fetch_task(task_id).await {
                Ok(data) => {
                    debug!(
                        "[MJ] task check res, task_id={}, attempt={}, data={:?}",
                        task_id, attempts, data
                    );
                    if data.is_finished() {
                        self.deliverer.deliver(task_id, &data, ctx).await;
                        return PollOutcome::Finished {
                            attempts,
                            remaining_budget: budget,
                        };
                    }
                }
                Err(e) => {
                    warn!("[MJ] image check error, task_id={}: {}", task_id, e);
                    budget -= i64::from(self.settings.error_penalty);
                }
            }

            tokio::time::sleep(self.settings.interval).await;
            budget -= 1;
        }

        warn!(
            "[MJ] end from poll, task_id={}, attempts={}",
            task_id, attempts
        );
        if self.settings.notify_on_exhaustion {
            self.deliverer.notify_exhausted(task_id, ctx).await;
        }
        PollOutcome::Exhausted { attempts }
    }
}
