//! Gemini API連携
//!
//! generateContent に画像（Base64インライン）とプロンプトを送り、
//! 候補の先頭のテキストを返す。

use super::{Transport, TransportError};
use crate::config::Config;
use crate::device::ImageCapture;
use crate::error::{Result, ShelfCountError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use shelf_count_common::{build_count_prompt, PromptDialect};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補のテキストパートを連結
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct GeminiTransport {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dialect: PromptDialect,
}

impl GeminiTransport {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ShelfCountError::Config(format!("HTTPクライアント生成エラー: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.get_api_key()?,
            model: config.model.clone(),
            dialect: config.prompt_dialect,
        })
    }

    fn build_request(&self, image: &ImageCapture, expected_label: &str) -> GeminiRequest {
        let prompt = build_count_prompt(expected_label, self.dialect);

        GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: STANDARD.encode(image.bytes()),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.1 },
        }
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn invoke_model(
        &self,
        image: &ImageCapture,
        expected_label: &str,
    ) -> std::result::Result<String, TransportError> {
        let request = self.build_request(image, expected_label);
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        tracing::info!(model = %self.model, label = expected_label, bytes = image.len(), "calling gemini");

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status: status.as_u16(), body });
        }

        let payload: GeminiResponse = response.json().await?;
        let text = payload.into_text().ok_or(TransportError::EmptyResponse)?;

        tracing::debug!(chars = text.len(), "gemini replied");
        Ok(text)
    }
}
