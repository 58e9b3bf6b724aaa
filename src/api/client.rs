use super::MidjourneyService;
use crate::models::{
    ApiResponse, GenerateData, GenerateRequest, OperateData, OperateRequest, TaskStatusData,
    TaskType, DEFAULT_BASE_URL,
};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const SUCCESS_CODE: i64 = 200;

pub struct MidjourneyClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MidjourneyClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self::new_with_client(api_key, client))
    }

    pub fn new_with_client(api_key: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<ApiResponse<Resp>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("[MJ] Failed to send request to {}: {}", path, e);
                e
            })?;

        Self::read_envelope(path, response).await
    }

    async fn get<Resp: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<Resp>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("[MJ] Failed to send request to {}: {}", path, e);
                e
            })?;

        Self::read_envelope(path, response).await
    }

    async fn read_envelope<Resp: DeserializeOwned>(
        path: &str,
        response: Response,
    ) -> Result<ApiResponse<Resp>> {
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            // Error bodies usually carry a JSON `message`, fall back to the raw text.
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or(body);
            tracing::debug!("[MJ] {} returned status {}: {}", path, status, message);
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("[MJ] Failed to parse {} response: {}\nBody: {}", path, e, body);
            Error::Serialization(e)
        })
    }

    /// Unwrap `data` from an envelope whose `code` must signal success.
    fn accepted<T>(envelope: ApiResponse<T>) -> Result<T> {
        let message = envelope.message.unwrap_or_default();
        match (envelope.code, envelope.data) {
            (Some(SUCCESS_CODE), Some(data)) => Ok(data),
            (Some(SUCCESS_CODE), None) => Err(Error::RemoteCode {
                code: SUCCESS_CODE,
                message: "response carried no data".to_string(),
            }),
            (code, _) => Err(Error::RemoteCode {
                code: code.unwrap_or_default(),
                message,
            }),
        }
    }
}

#[async_trait]
impl MidjourneyService for MidjourneyClient {
    async fn generate(&self, prompt: &str) -> Result<GenerateData> {
        let request = GenerateRequest {
            prompt: prompt.to_string(),
        };
        let envelope: ApiResponse<GenerateData> = self.post("/generate", &request).await?;
        tracing::debug!("[MJ] image generate, res={:?}", envelope);
        Self::accepted(envelope)
    }

    async fn upscale(&self, img_id: &str, index: u8) -> Result<OperateData> {
        let request = OperateRequest {
            operation: TaskType::Upscale,
            img_id: img_id.to_string(),
            index,
        };
        let envelope: ApiResponse<OperateData> = self.post("/operate", &request).await?;
        tracing::debug!("[MJ] image upscale, res={:?}", envelope);
        Self::accepted(envelope)
    }

    async fn fetch_task(&self, task_id: &str) -> Result<TaskStatusData> {
        let envelope: ApiResponse<TaskStatusData> =
            self.get(&format!("/tasks/{}", task_id)).await?;
        Ok(envelope.data.unwrap_or_default())
    }
}
