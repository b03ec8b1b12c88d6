use std::future::Future;

use anyhow::{Context, Result};
use async_openai::{Client, config::OpenAIConfig};

use super::response::{ChatMessage, request_text_response};
use super::secrets::Credential;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub trait CompletionService {
    fn complete(
        &self,
        messages: &[ChatMessage],
        credential: &Credential,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone, Debug)]
pub struct OpenAiCompletion {
    model: String,
}

impl OpenAiCompletion {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for OpenAiCompletion {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl CompletionService for OpenAiCompletion {
    async fn complete(&self, messages: &[ChatMessage], credential: &Credential) -> Result<String> {
        let client = initialize_client(credential);
        request_text_response(&client, &self.model, messages).await
    }
}

pub async fn test_credential(credential: &Credential) -> Result<()> {
    let client = initialize_client(credential);
    healthcheck_client(&client).await
}

fn initialize_client(credential: &Credential) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new().with_api_key(credential.expose());
    Client::with_config(config)
}

async fn healthcheck_client(client: &Client<OpenAIConfig>) -> Result<()> {
    client
        .models()
        .list()
        .await
        .context("Failed to validate API key with OpenAI")?;
    Ok(())
}
