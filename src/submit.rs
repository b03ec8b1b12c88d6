//! The query → complete → translate pipeline.
//!
//! The two network steps run in `fetch_response`, which can live on a
//! background task. Translation and merging happen in `apply_response` on the
//! thread that owns the collection, so ids are always drawn from the current
//! counter even if cards were added while the request was in flight.

use crate::collection::CardCollection;
use crate::error::GeneratorError;
use crate::llm::{CompletionService, Credential, card_request};
use crate::qbreader::{QueryParams, QuestionDatabase};
use crate::translate::translate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Querying,
    Completing { questions: usize },
}

impl Stage {
    pub fn describe(&self) -> String {
        match self {
            Stage::Querying => "Querying the question database...".to_string(),
            Stage::Completing { questions } => {
                format!("Sending {questions} questions to the model...")
            }
        }
    }
}

/// Busy flag for the submit action: one request at a time, no queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubmitGate {
    busy: bool,
}

impl SubmitGate {
    pub fn begin(&mut self) -> Result<(), GeneratorError> {
        if self.busy {
            return Err(GeneratorError::Busy);
        }
        self.busy = true;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.busy = false;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

pub async fn fetch_response<D, C>(
    database: &D,
    completion: &C,
    params: &QueryParams,
    credential: Option<&Credential>,
    mut on_stage: impl FnMut(Stage) + Send,
) -> Result<String, GeneratorError>
where
    D: QuestionDatabase + Sync,
    C: CompletionService + Sync,
{
    on_stage(Stage::Querying);
    let results = database
        .query(params)
        .await
        .map_err(|err| GeneratorError::upstream(&err))?;
    if results.is_empty() {
        return Err(GeneratorError::UpstreamEmpty);
    }

    let credential = credential.ok_or(GeneratorError::MissingCredential)?;
    let messages = card_request(&params.query_string, &results.sanitized())
        .map_err(|err| GeneratorError::upstream(&err))?;

    on_stage(Stage::Completing {
        questions: results.question_count(),
    });
    completion
        .complete(&messages, credential)
        .await
        .map_err(|err| GeneratorError::upstream(&err))
}

#[derive(Clone, Debug)]
pub struct Applied {
    pub collection: CardCollection,
    pub added: usize,
    pub rejected: usize,
}

/// Translates a model response and puts the new cards in front.
/// A response without usable lines leaves `collection` untouched.
pub fn apply_response(raw: &str, collection: &CardCollection) -> Result<Applied, GeneratorError> {
    let translation = translate(raw, collection).into_nonempty()?;
    let added = translation.cards.len();
    Ok(Applied {
        collection: collection.insert_front(translation.cards),
        added,
        rejected: translation.rejected,
    })
}

pub async fn submit<D, C>(
    database: &D,
    completion: &C,
    params: &QueryParams,
    credential: Option<&Credential>,
    collection: &CardCollection,
    on_stage: impl FnMut(Stage) + Send,
) -> Result<Applied, GeneratorError>
where
    D: QuestionDatabase + Sync,
    C: CompletionService + Sync,
{
    let raw = fetch_response(database, completion, params, credential, on_stage).await?;
    apply_response(&raw, collection)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};

    use super::*;
    use crate::llm::ChatMessage;
    use crate::qbreader::{QueryResults, QuestionSet, Tossup};

    struct FakeDatabase {
        results: Option<QueryResults>,
    }

    impl QuestionDatabase for FakeDatabase {
        async fn query(&self, _params: &QueryParams) -> Result<QueryResults> {
            self.results
                .clone()
                .ok_or_else(|| anyhow!("502 Bad Gateway"))
        }
    }

    struct FakeCompletion {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl FakeCompletion {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CompletionService for FakeCompletion {
        async fn complete(&self, messages: &[ChatMessage], credential: &Credential) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(messages.len(), 2);
            assert_eq!(credential.expose(), "sk-test");
            self.reply.clone().map_err(|message| anyhow!(message))
        }
    }

    fn one_tossup() -> QueryResults {
        QueryResults {
            tossups: QuestionSet {
                question_array: vec![Tossup {
                    question: "Name this sculptor.".into(),
                    answer: "Barbara Hepworth".into(),
                    ..Tossup::default()
                }],
            },
            ..QueryResults::default()
        }
    }

    fn credential() -> Credential {
        Credential::new("sk-test").unwrap()
    }

    #[tokio::test]
    async fn successful_flow_prepends_translated_cards() {
        let database = FakeDatabase {
            results: Some(one_tossup()),
        };
        let completion = FakeCompletion::replying("{{c1::Hepworth}} made {{c2::Single Form}}\nnoise");
        let existing = CardCollection::new().insert_one();
        let mut stages = Vec::new();

        let applied = submit(
            &database,
            &completion,
            &QueryParams::new("Hepworth"),
            Some(&credential()),
            &existing,
            |stage| stages.push(stage),
        )
        .await
        .unwrap();

        assert_eq!(applied.added, 1);
        assert_eq!(applied.collection.len(), 2);
        assert_eq!(
            applied.collection.cards()[0].content,
            "{{c1::Hepworth}} made {{c2::Single Form}}"
        );
        assert_eq!(
            stages,
            vec![Stage::Querying, Stage::Completing { questions: 1 }]
        );
    }

    #[tokio::test]
    async fn empty_database_result_skips_completion() {
        let database = FakeDatabase {
            results: Some(QueryResults::default()),
        };
        let completion = FakeCompletion::replying("{{c1::x}}");
        let result = fetch_response(
            &database,
            &completion,
            &QueryParams::new("nothing"),
            Some(&credential()),
            |_| {},
        )
        .await;

        assert_eq!(result, Err(GeneratorError::UpstreamEmpty));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_skips_completion() {
        let database = FakeDatabase {
            results: Some(one_tossup()),
        };
        let completion = FakeCompletion::replying("{{c1::x}}");
        let result = fetch_response(
            &database,
            &completion,
            &QueryParams::new("Hepworth"),
            None,
            |_| {},
        )
        .await;

        assert_eq!(result, Err(GeneratorError::MissingCredential));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_failures_surface_their_message() {
        let database = FakeDatabase { results: None };
        let completion = FakeCompletion::replying("{{c1::x}}");
        let result = fetch_response(
            &database,
            &completion,
            &QueryParams::new("q"),
            Some(&credential()),
            |_| {},
        )
        .await;
        assert_eq!(result, Err(GeneratorError::Upstream("502 Bad Gateway".into())));

        let database = FakeDatabase {
            results: Some(one_tossup()),
        };
        let completion = FakeCompletion::failing("invalid_api_key");
        let result = fetch_response(
            &database,
            &completion,
            &QueryParams::new("q"),
            Some(&credential()),
            |_| {},
        )
        .await;
        assert_eq!(result, Err(GeneratorError::Upstream("invalid_api_key".into())));
    }

    #[test]
    fn empty_translation_leaves_collection_unchanged() {
        let existing = CardCollection::new().insert_one();
        let err = apply_response("I could not find any clues.", &existing).unwrap_err();
        assert_eq!(err, GeneratorError::EmptyTranslation { rejected: 0 });
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn gate_rejects_second_submission_until_finished() {
        let mut gate = SubmitGate::default();
        gate.begin().unwrap();
        assert!(gate.is_busy());
        assert_eq!(gate.begin(), Err(GeneratorError::Busy));
        gate.finish();
        assert!(gate.begin().is_ok());
    }
}
