//! Validator backed by an OpenAI-compatible chat completions endpoint

use crate::analysis::{TestCase, TestValidator, ValidationError};
use crate::config::ValidatorConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a QA automation expert reviewing test cases and Page Object Model code.";

/// Sends test cases and page-object code to a chat model for review
#[derive(Debug)]
pub struct ChatValidator {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ChatValidator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ValidationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ValidationError::NotConfigured(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Builds a validator from config, reading the API key from the environment
    pub fn from_config(config: &ValidatorConfig) -> Result<Self, ValidationError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ValidationError::NotConfigured(format!("{} not set", config.api_key_env))
        })?;

        Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

fn review_prompt(test_cases_json: &str, pom_code: &str) -> String {
    format!(
        "Review the following test cases and POM code for correctness, coverage, and adherence to best practices. Provide feedback or suggested improvements.\n\nTest Cases:\n{}\n\nPOM Code:\n{}\n\nReturn your feedback as plain text.",
        test_cases_json, pom_code
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatApiError,
}

#[derive(Debug, Deserialize)]
struct ChatApiError {
    message: String,
}

#[async_trait]
impl TestValidator for ChatValidator {
    async fn validate(
        &self,
        test_cases: &[TestCase],
        pom_code: &str,
    ) -> Result<String, ValidationError> {
        let cases_json = serde_json::to_string_pretty(test_cases)
            .map_err(|e| ValidationError::ParseError(e.to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: review_prompt(&cases_json, pom_code),
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ValidationError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ValidationError::RequestFailed(e.to_string()))?;

        if status != 200 {
            let message = serde_json::from_str::<ChatErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(ValidationError::ApiError { status, message });
        }

        let response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ValidationError::ParseError(e.to_string()))?;

        // An empty reply is still a successful review
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
