use std::time::Duration;

use lorewise_config::AssistantConfig;
use lorewise_engine::source::{EditProposal, ProposalRequest, SourceError, SuggestionSource};
use serde::{Deserialize, Serialize};

use crate::parse::{parse_proposal, sanitize_content};
use crate::prompt::{SYSTEM_PROMPT, build_user_prompt};

/// Failure to set up a source; request-time failures are [`SourceError`]s
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error("API key not found: set the {var} environment variable")]
    MissingApiKey { var: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Null when the provider refused or filtered the reply
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Proposes edits by asking a chat completions endpoint
pub struct ChatCompletionSource {
    client: reqwest::Client,
    config: AssistantConfig,
    api_key: String,
}

impl ChatCompletionSource {
    /// Build a source, reading the API key from the configured environment variable
    pub fn new(config: AssistantConfig) -> Result<Self, AssistError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AssistError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: AssistantConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, AssistError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Send one request and return the assistant's message text
    async fn complete(&self, user: &str) -> Result<String, SourceError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            stream: false,
        };

        log::debug!(
            "requesting suggestions from {} ({}, {} prompt chars)",
            self.config.endpoint,
            self.config.model,
            user.chars().count()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            log::warn!("assistant returned HTTP {status}");
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: sanitize_content(&text),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|err| {
            SourceError::Parse(format!(
                "unexpected response shape: {err} (content: {})",
                sanitize_content(&text)
            ))
        })?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| SourceError::Parse("response has no choices".to_string()))?;

        match (message.content, message.refusal) {
            (Some(content), _) if !content.trim().is_empty() => Ok(content),
            (_, Some(refusal)) => Err(SourceError::Rejected(refusal)),
            _ => Err(SourceError::Parse("response message is empty".to_string())),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Transport(format!(
                "request timed out after {}s",
                self.config.timeout_secs
            ))
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

impl SuggestionSource for ChatCompletionSource {
    async fn propose_edits(&self, request: &ProposalRequest) -> Result<EditProposal, SourceError> {
        let user = build_user_prompt(request, self.config.max_reference_chars);
        let content = self.complete(&user).await?;
        let proposal = parse_proposal(&content)?;
        log::debug!("assistant proposed {} edits", proposal.edits.len());
        Ok(proposal)
    }
}

impl std::fmt::Debug for ChatCompletionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionSource")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}
