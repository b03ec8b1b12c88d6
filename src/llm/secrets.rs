use std::env;
use std::fmt;

use anyhow::{Context, Result};
use dialoguer::{Password, theme::ColorfulTheme};

use crate::palette::Palette;
use crate::utils::strip_controls_and_escapes;

pub const API_KEY_ENV: &str = "QBCLOZE_OPENAI_API_KEY";
const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";
const OPENAI_KEY_PREFIX: &str = "sk-";

/// An OpenAI API key held in memory for one session.
///
/// Never written to disk; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: &str) -> Option<Self> {
        let cleaned = strip_controls_and_escapes(raw);
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn looks_like_openai_key(&self) -> bool {
        self.0.starts_with(OPENAI_KEY_PREFIX)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Prompt,
}

impl CredentialSource {
    pub fn description(&self) -> &'static str {
        match self {
            CredentialSource::Environment => "environment variable",
            CredentialSource::Prompt => "prompt",
        }
    }
}

pub fn credential_from_env() -> Option<Credential> {
    [API_KEY_ENV, FALLBACK_API_KEY_ENV]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find_map(|value| Credential::new(&value))
}

pub fn prompt_for_credential() -> Result<Option<Credential>> {
    println!(
        "{} (https://platform.openai.com/account/api-keys) to generate cards. It is kept in memory only and never saved.",
        Palette::success("Enter your OpenAI API key")
    );
    let raw_password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API Key")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read the API key")?;

    Ok(Credential::new(&raw_password))
}

/// Environment first, then an interactive prompt when `interactive` is set.
pub fn capture_credential(interactive: bool) -> Result<Option<(Credential, CredentialSource)>> {
    if let Some(credential) = credential_from_env() {
        return Ok(Some((credential, CredentialSource::Environment)));
    }
    if !interactive {
        return Ok(None);
    }

    let captured = prompt_for_credential()?;
    if let Some(credential) = &captured
        && !credential.looks_like_openai_key()
    {
        eprintln!(
            "{}",
            Palette::warning(format!(
                "That key does not start with '{OPENAI_KEY_PREFIX}'; using it anyway."
            ))
        );
    }
    Ok(captured.map(|credential| (credential, CredentialSource::Prompt)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_cleaned_and_rejects_blank() {
        let credential = Credential::new("  sk-abc\x1b[0m\n").unwrap();
        assert_eq!(credential.expose(), "sk-abc");
        assert!(credential.looks_like_openai_key());
        assert!(Credential::new("   \t").is_none());
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::new("sk-secret").unwrap();
        let shown = format!("{credential:?}");
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn non_openai_prefix_is_flagged() {
        let credential = Credential::new("not-a-key").unwrap();
        assert!(!credential.looks_like_openai_key());
    }
}
