use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::config::PapersConfig;
use crate::errors::{ProviderError, ProviderResult};
use crate::providers::TextGenerator;
use crate::types::*;

/// Client for the Gemini generateContent API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    model: GeminiModel,
}

impl GeminiClient {
    /// Create a new Gemini API client.
    ///
    /// Fails when no API key is configured — construction happens at
    /// startup, so a missing credential is fatal before any call is made.
    pub fn new(config: &PapersConfig) -> ProviderResult<Self> {
        let api_key = config.require_api_key()?;
        let model = GeminiModel::new(api_key, config.model_name.clone());

        Ok(Self {
            client: Client::new(),
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model.model_name, self.model.api_key
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                ProviderError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(ProviderError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        let response_body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ProviderError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(response_body)
    }

    fn single_turn_request(prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt.to_string())],
                role: Some("user".to_string()),
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(0.7),
                ..GenerationConfig::default()
            }),
        }
    }

    /// Extract the first candidate's text from a response. An empty parts
    /// list or missing text is a response error, not an empty string —
    /// callers distinguish "provider said nothing" from "provider broke".
    pub fn extract_text(response: &GenerateContentResponse) -> ProviderResult<String> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| ProviderError::ResponseError("No candidates in response".to_string()))?;

        let content = candidate
            .content
            .as_ref()
            .ok_or_else(|| ProviderError::ResponseError("No content in candidate".to_string()))?;

        let part = content
            .parts
            .first()
            .ok_or_else(|| ProviderError::ResponseError("No parts in content".to_string()))?;

        let text = part
            .text
            .as_ref()
            .ok_or_else(|| ProviderError::ResponseError("No text in part".to_string()))?;

        Ok(text.clone())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        debug!(
            "Sending {}-char prompt to model '{}'",
            prompt.len(),
            self.model.model_name
        );
        let request = Self::single_turn_request(prompt);
        let response = self.generate_content(request).await?;
        Ok(Self::extract_text(&response)?.trim().to_string())
    }
}
