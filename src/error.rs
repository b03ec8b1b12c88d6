use thiserror::Error;

use crate::card::CardId;

/// Failures the card pipeline reports to the user.
///
/// Every variant renders as a single line so the editor can show it in its
/// status bar; the latest error replaces any earlier one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("No results found in the database.")]
    UpstreamEmpty,
    #[error("Please enter your API key.")]
    MissingCredential,
    #[error("{0}")]
    Upstream(String),
    #[error("The model returned no cloze lines ({rejected} malformed lines skipped).")]
    EmptyTranslation { rejected: usize },
    #[error("No cards to export.")]
    EmptyExport,
    #[error("Card {0} no longer exists.")]
    UnknownCard(CardId),
    #[error("A request is already in progress.")]
    Busy,
    #[error("This card already uses the highest cloze number.")]
    ClozeLimit,
}

impl GeneratorError {
    /// Collapses an `anyhow` chain into one upstream message.
    pub fn upstream(err: &anyhow::Error) -> Self {
        let flat = err
            .chain()
            .map(|cause| cause.to_string().replace('\n', " "))
            .collect::<Vec<_>>()
            .join(": ");
        GeneratorError::Upstream(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn upstream_flattens_cause_chain() {
        let err = Err::<(), _>(anyhow!("503 Service\nUnavailable"))
            .context("Failed to query the question database")
            .unwrap_err();
        assert_eq!(
            GeneratorError::upstream(&err),
            GeneratorError::Upstream(
                "Failed to query the question database: 503 Service Unavailable".to_string()
            )
        );
    }

    #[test]
    fn empty_translation_mentions_rejected_lines() {
        let msg = GeneratorError::EmptyTranslation { rejected: 2 }.to_string();
        assert!(msg.contains("2 malformed"));
    }
}
