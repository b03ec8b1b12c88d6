use anyhow::{Context, Result, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, InputMessage, InputRole, OutputItem, OutputMessageContent,
    },
};

const MAX_OUTPUT_TOKENS: u32 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl From<Role> for InputRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => InputRole::System,
            Role::User => InputRole::User,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sends `messages` in order and returns the first non-empty text output.
pub async fn request_text_response(
    client: &Client<OpenAIConfig>,
    model: &str,
    messages: &[ChatMessage],
) -> Result<String> {
    let input: Vec<InputMessage> = messages
        .iter()
        .map(|message| InputMessage {
            role: message.role.into(),
            content: vec![message.content.as_str().into()],
            status: None,
        })
        .collect();

    let request = CreateResponseArgs::default()
        .model(model)
        .max_output_tokens(MAX_OUTPUT_TOKENS)
        .input(input)
        .build()?;

    let response = client
        .responses()
        .create(request)
        .await
        .with_context(|| "Failed to get response from LLM")?;

    for item in response.output {
        if let OutputItem::Message(message) = item {
            for content in message.content {
                if let OutputMessageContent::OutputText(text) = content {
                    let trimmed = text.text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Ok(trimmed.to_string());
                }
            }
        }
    }

    bail!("No text output returned from model")
}
