use super::MidjourneyService;
use crate::models::{GenerateData, OperateData, TaskStatusData};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Canned result for one mocked API call.
#[derive(Debug, Clone)]
enum Outcome<T> {
    Ok(T),
    Status(u16),
    Code(i64),
}

impl<T> Outcome<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::Status(status) => Err(Error::RemoteStatus {
                status,
                message: "mock status".to_string(),
            }),
            Outcome::Code(code) => Err(Error::RemoteCode {
                code,
                message: "mock code".to_string(),
            }),
        }
    }
}

/// In-memory stand-in for the proxy API. Queued outcomes are consumed in
/// order; an empty queue falls back to a successful default.
#[derive(Clone)]
pub struct MockMidjourneyClient {
    generate_outcomes: Arc<Mutex<VecDeque<Outcome<GenerateData>>>>,
    upscale_outcomes: Arc<Mutex<VecDeque<Outcome<OperateData>>>>,
    poll_outcomes: Arc<Mutex<VecDeque<Outcome<TaskStatusData>>>>,
    generate_prompts: Arc<Mutex<Vec<String>>>,
    upscale_calls: Arc<Mutex<Vec<(String, u8)>>>,
    poll_count: Arc<Mutex<usize>>,
}

impl MockMidjourneyClient {
    pub fn new() -> Self {
        Self {
            generate_outcomes: Arc::new(Mutex::new(VecDeque::new())),
            upscale_outcomes: Arc::new(Mutex::new(VecDeque::new())),
            poll_outcomes: Arc::new(Mutex::new(VecDeque::new())),
            generate_prompts: Arc::new(Mutex::new(Vec::new())),
            upscale_calls: Arc::new(Mutex::new(Vec::new())),
            poll_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_generate_task(self, task_id: &str, real_prompt: Option<&str>) -> Self {
        self.generate_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Ok(GenerateData {
                task_id: task_id.to_string(),
                real_prompt: real_prompt.map(str::to_string),
            }));
        self
    }

    pub fn with_generate_status(self, status: u16) -> Self {
        self.generate_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Status(status));
        self
    }

    pub fn with_generate_code(self, code: i64) -> Self {
        self.generate_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Code(code));
        self
    }

    pub fn with_upscale_task(self, task_id: &str) -> Self {
        self.upscale_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Ok(OperateData {
                task_id: task_id.to_string(),
            }));
        self
    }

    pub fn with_upscale_status(self, status: u16) -> Self {
        self.upscale_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Status(status));
        self
    }

    pub fn with_poll_status(self, status: &str) -> Self {
        self.poll_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Ok(TaskStatusData {
                status: Some(status.to_string()),
                img_id: None,
                img_url: None,
            }));
        self
    }

    pub fn with_poll_finished(self, img_id: &str, img_url: &str) -> Self {
        self.poll_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Ok(TaskStatusData {
                status: Some("FINISHED".to_string()),
                img_id: Some(img_id.to_string()),
                img_url: Some(img_url.to_string()),
            }));
        self
    }

    pub fn with_poll_failure(self, status: u16) -> Self {
        self.poll_outcomes
            .lock()
            .unwrap()
            .push_back(Outcome::Status(status));
        self
    }

    pub fn get_generate_prompts(&self) -> Vec<String> {
        self.generate_prompts.lock().unwrap().clone()
    }

    pub fn get_upscale_calls(&self) -> Vec<(String, u8)> {
        self.upscale_calls.lock().unwrap().clone()
    }

    pub fn get_poll_count(&self) -> usize {
        *self.poll_count.lock().unwrap()
    }
}

impl Default for MockMidjourneyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MidjourneyService for MockMidjourneyClient {
    async fn generate(&self, prompt: &str) -> Result<GenerateData> {
        self.generate_prompts
            .lock()
            .unwrap()
            .push(prompt.to_string());

        let next = self.generate_outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Outcome::Ok(GenerateData {
                task_id: Uuid::new_v4().to_string(),
                real_prompt: None,
            })
        })
        .into_result()
    }

    async fn upscale(&self, img_id: &str, index: u8) -> Result<OperateData> {
        self.upscale_calls
            .lock()
            .unwrap()
            .push((img_id.to_string(), index));

        let next = self.upscale_outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Outcome::Ok(OperateData {
                task_id: Uuid::new_v4().to_string(),
            })
        })
        .into_result()
    }

    async fn fetch_task(&self, _task_id: &str) -> Result<TaskStatusData> {
        *self.poll_count.lock().unwrap() += 1;

        let next = self.poll_outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Outcome::Ok(TaskStatusData {
                status: Some("IN_PROGRESS".to_string()),
                img_id: None,
                img_url: None,
            })
        })
        .into_result()
    }
}
