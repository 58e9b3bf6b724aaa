//! Data models and structures
//!
//! Defines the task records tracked by the plugin, the request/response
//! bodies of the Midjourney proxy API, and the env-driven configuration.

use crate::poller::PollSettings;
use crate::registry::RetentionPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.link-ai.chat/v1/img/midjourney";
pub const DEFAULT_TRIGGER_PREFIX: &str = "$";
pub const DEFAULT_TASK_EXPIRY: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Generate,
    Upscale,
    Variation,
    Reset,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Generate => "GENERATE",
            TaskType::Upscale => "UPSCALE",
            TaskType::Variation => "VARIATION",
            TaskType::Reset => "RESET",
        }
    }

    /// Key used to remember that an image/index pair was already operated on.
    pub fn operation_key(&self, img_id: &str, index: u8) -> String {
        format!("{}_{}_{}", self.as_str(), img_id, index)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pending,
    Finished,
    Expired,
    Aborted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Finished => "FINISHED",
            Status::Expired => "EXPIRED",
            Status::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outstanding generation or upscale job.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub task_type: TaskType,
    pub raw_prompt: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
    pub img_id: Option<String>,
    pub img_url: Option<String>,
}

impl Task {
    pub fn new(
        id: String,
        owner_id: String,
        task_type: TaskType,
        raw_prompt: Option<String>,
        expires: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let expires = chrono::Duration::from_std(expires)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_TASK_EXPIRY.as_secs() as i64));

        Self {
            id,
            owner_id,
            task_type,
            raw_prompt,
            status: Status::Pending,
            created_at,
            expiry_time: created_at + expires,
            img_id: None,
            img_url: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_time
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={}, user_id={}, task_type={}, status={}, img_id={}",
            self.id,
            self.owner_id,
            self.task_type,
            self.status,
            self.img_id.as_deref().unwrap_or("None")
        )
    }
}

// Midjourney proxy API Request/Response models
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperateRequest {
    #[serde(rename = "type")]
    pub operation: TaskType,
    pub img_id: String,
    pub index: u8,
}

/// Envelope shared by every endpoint of the proxy API.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateData {
    pub task_id: String,
    pub real_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperateData {
    pub task_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusData {
    /// Missing and `null` both mean the job has no status yet.
    #[serde(default)]
    pub status: Option<String>,
    pub img_id: Option<String>,
    pub img_url: Option<String>,
}

impl TaskStatusData {
    pub fn is_finished(&self) -> bool {
        self.status.as_deref() == Some(Status::Finished.as_str())
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub enabled: bool,
    pub trigger_prefix: String,
    pub base_url: String,
    pub poll_budget: u32,
    pub poll_interval: Duration,
    pub poll_error_penalty: u32,
    pub notify_on_exhaustion: bool,
    pub task_expiry: Duration,
    pub retention: Option<Duration>,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("LINKAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| crate::Error::Config("LINKAI_API_KEY not set".to_string()))?;

        let retention = match lookup("MJ_RETENTION_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_value("MJ_RETENTION_SECS", &raw)?)),
            None => None,
        };

        Ok(Self {
            api_key,
            enabled: parse_bool(&lookup, "MJ_ENABLED", false)?,
            trigger_prefix: lookup("PLUGIN_TRIGGER_PREFIX")
                .unwrap_or_else(|| DEFAULT_TRIGGER_PREFIX.to_string()),
            base_url: lookup("MJ_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            poll_budget: parse_or(&lookup, "MJ_POLL_BUDGET", 80u32)?,
            poll_interval: Duration::from_secs(parse_or(&lookup, "MJ_POLL_INTERVAL_SECS", 10)?),
            poll_error_penalty: parse_or(&lookup, "MJ_POLL_ERROR_PENALTY", 20u32)?,
            notify_on_exhaustion: parse_bool(&lookup, "MJ_NOTIFY_ON_EXHAUSTION", false)?,
            task_expiry: Duration::from_secs(parse_or(
                &lookup,
                "MJ_TASK_EXPIRY_SECS",
                DEFAULT_TASK_EXPIRY.as_secs(),
            )?),
            retention,
        })
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            budget: self.poll_budget,
            interval: self.poll_interval,
            error_penalty: self.poll_error_penalty,
            notify_on_exhaustion: self.notify_on_exhaustion,
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        match self.retention {
            Some(ttl) => RetentionPolicy::Ttl(ttl),
            None => RetentionPolicy::Unbounded,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> crate::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| crate::Error::Config(format!("Invalid value for {}: '{}'", key, raw)))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> crate::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> crate::Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(crate::Error::Config(format!(
            "Invalid value for {}: '{}'",
            key, raw
        ))),
    }
}
