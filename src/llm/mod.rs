pub mod client;
pub mod prompt;
pub mod response;
pub mod secrets;

pub use client::{CompletionService, DEFAULT_MODEL, OpenAiCompletion, test_credential};
pub use prompt::card_request;
pub use response::{ChatMessage, Role};
pub use secrets::{API_KEY_ENV, Credential, CredentialSource, capture_credential};
