//! Midjourney proxy API integration
//!
//! Starts generation and upscale jobs and reads job status from the LinkAI
//! Midjourney proxy.

pub mod client;
pub mod mock;

pub use client::MidjourneyClient;
pub use mock::MockMidjourneyClient;

use crate::models::{GenerateData, OperateData, TaskStatusData};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait MidjourneyService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerateData>;
    async fn upscale(&self, img_id: &str, index: u8) -> Result<OperateData>;
    async fn fetch_task(&self, task_id: &str) -> Result<TaskStatusData>;
}
