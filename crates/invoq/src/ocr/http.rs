//! JSON-over-HTTP OCR provider adapter.
//!
//! `POST {endpoint}/jobs` submits a job and answers `{"job_id": "..."}`;
//! `GET {endpoint}/jobs/{id}` answers an [`OcrJobResult`]. Client errors
//! carry `{"code": "...", "message": "..."}`.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

use super::payload::OcrJobResult;
use super::provider::{OcrJobRequest, OcrProvider};

const MAX_ERROR_BODY_LENGTH: usize = 200;

#[derive(Debug, Serialize)]
struct StartJobBody<'a> {
    document_key: &'a str,
    mime_type: &'a str,
    features: Features,
}

#[derive(Debug, Serialize)]
struct Features {
    deskew: bool,
}

#[derive(Debug, Deserialize)]
struct StartJobResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

pub struct HttpOcrProvider {
    client: Client,
    endpoint: String,
}

impl HttpOcrProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    async fn read_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_client_error() {
            if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) {
                return ProviderError::Rejected {
                    code: parsed.code,
                    message: parsed.message,
                };
            }
        }

        ProviderError::Status {
            status: status.as_u16(),
            body: truncate_body(&body),
        }
    }
}

#[async_trait]
impl OcrProvider for HttpOcrProvider {
    async fn start_job(&self, request: &OcrJobRequest) -> Result<String, ProviderError> {
        let body = StartJobBody {
            document_key: &request.key,
            mime_type: &request.mime_type,
            features: Features {
                deskew: request.native_deskew,
            },
        };

        let response = self
            .client
            .post(format!("{}/jobs", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let parsed = response
            .json::<StartJobResponse>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        debug!("OCR job {} started", parsed.job_id);
        Ok(parsed.job_id)
    }

    async fn get_job_result(&self, job_id: &str) -> Result<OcrJobResult, ProviderError> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.endpoint, job_id))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<OcrJobResult>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}
