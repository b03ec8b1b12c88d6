use std::future::Future;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const QUERY_URL: &str = "https://www.qbreader.org/api/query";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_MAX_RETURN_LENGTH: u32 = 25;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum QuestionType {
    Tossup,
    Bonus,
    #[default]
    All,
}

impl QuestionType {
    fn as_param(self) -> &'static str {
        match self {
            QuestionType::Tossup => "tossup",
            QuestionType::Bonus => "bonus",
            QuestionType::All => "all",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SearchType {
    Question,
    Answer,
    #[default]
    All,
}

impl SearchType {
    fn as_param(self) -> &'static str {
        match self {
            SearchType::Question => "question",
            SearchType::Answer => "answer",
            SearchType::All => "all",
        }
    }
}

/// One database request. Empty label lists are left out of the query, which
/// the database reads as "any".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParams {
    pub query_string: String,
    pub question_type: QuestionType,
    pub search_type: SearchType,
    pub case_sensitive: bool,
    pub exact_phrase: bool,
    pub difficulties: Vec<String>,
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
    pub alternate_subcategories: Vec<String>,
    pub max_return_length: u32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            query_string: String::new(),
            question_type: QuestionType::default(),
            search_type: SearchType::default(),
            case_sensitive: false,
            exact_phrase: false,
            difficulties: Vec::new(),
            categories: Vec::new(),
            subcategories: Vec::new(),
            alternate_subcategories: Vec::new(),
            max_return_length: DEFAULT_MAX_RETURN_LENGTH,
        }
    }
}

impl QueryParams {
    pub fn new(query_string: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            ..Self::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("queryString", self.query_string.clone()),
            ("questionType", self.question_type.as_param().to_string()),
            ("searchType", self.search_type.as_param().to_string()),
            ("caseSensitive", self.case_sensitive.to_string()),
            ("exactPhrase", self.exact_phrase.to_string()),
            ("maxReturnLength", self.max_return_length.to_string()),
        ];

        let lists = [
            ("difficulties", &self.difficulties),
            ("categories", &self.categories),
            ("subcategories", &self.subcategories),
            ("alternateSubcategories", &self.alternate_subcategories),
        ];
        for (name, values) in lists {
            if !values.is_empty() {
                pairs.push((name, values.join(",")));
            }
        }
        pairs
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Tossup {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    pub question_sanitized: Option<String>,
    pub answer_sanitized: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Bonus {
    #[serde(default)]
    pub leadin: String,
    #[serde(default)]
    pub parts: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    pub leadin_sanitized: Option<String>,
    pub parts_sanitized: Option<Vec<String>>,
    pub answers_sanitized: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet<T> {
    #[serde(default)]
    pub question_array: Vec<T>,
}

impl<T> Default for QuestionSet<T> {
    fn default() -> Self {
        Self {
            question_array: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct QueryResults {
    #[serde(default)]
    pub tossups: QuestionSet<Tossup>,
    #[serde(default)]
    pub bonuses: QuestionSet<Bonus>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CleanTossup {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CleanBonus {
    pub leadin: String,
    pub parts: Vec<String>,
    pub answer: Vec<String>,
}

/// Questions reduced to the text the model gets to see.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct CleanResults {
    pub tossups: QuestionSet<CleanTossup>,
    pub bonuses: QuestionSet<CleanBonus>,
}

fn prefer(sanitized: Option<&str>, raw: &str) -> String {
    sanitized
        .filter(|text| !text.is_empty())
        .unwrap_or(raw)
        .to_string()
}

impl QueryResults {
    pub fn is_empty(&self) -> bool {
        self.tossups.question_array.is_empty() && self.bonuses.question_array.is_empty()
    }

    pub fn question_count(&self) -> usize {
        self.tossups.question_array.len() + self.bonuses.question_array.len()
    }

    pub fn sanitized(&self) -> CleanResults {
        let tossups = self
            .tossups
            .question_array
            .iter()
            .map(|tossup| CleanTossup {
                question: prefer(tossup.question_sanitized.as_deref(), &tossup.question),
                answer: prefer(tossup.answer_sanitized.as_deref(), &tossup.answer),
            })
            .collect();
        let bonuses = self
            .bonuses
            .question_array
            .iter()
            .map(|bonus| CleanBonus {
                leadin: prefer(bonus.leadin_sanitized.as_deref(), &bonus.leadin),
                parts: bonus
                    .parts_sanitized
                    .clone()
                    .unwrap_or_else(|| bonus.parts.clone()),
                answer: bonus
                    .answers_sanitized
                    .clone()
                    .unwrap_or_else(|| bonus.answers.clone()),
            })
            .collect();

        CleanResults {
            tossups: QuestionSet {
                question_array: tossups,
            },
            bonuses: QuestionSet {
                question_array: bonuses,
            },
        }
    }
}

pub trait QuestionDatabase {
    fn query(&self, params: &QueryParams) -> impl Future<Output = Result<QueryResults>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct QbReaderClient {
    http: reqwest::Client,
}

impl QbReaderClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuestionDatabase for QbReaderClient {
    async fn query(&self, params: &QueryParams) -> Result<QueryResults> {
        let url = reqwest::Url::parse_with_params(QUERY_URL, params.query_pairs())
            .context("Failed to build the question database URL")?;

        let results: QueryResults = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Failed to reach the question database")?
            .error_for_status()
            .context("Question database rejected the query")?
            .json()
            .await
            .context("Failed to decode question database response")?;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pairs_match_database_defaults() {
        let pairs = QueryParams::new("Barbara Hepworth").query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("queryString", "Barbara Hepworth".to_string()),
                ("questionType", "all".to_string()),
                ("searchType", "all".to_string()),
                ("caseSensitive", "false".to_string()),
                ("exactPhrase", "false".to_string()),
                ("maxReturnLength", "25".to_string()),
            ]
        );
    }

    #[test]
    fn label_lists_are_comma_joined() {
        let params = QueryParams {
            difficulties: vec!["3".into(), "4".into()],
            categories: vec!["Fine Arts".into()],
            ..QueryParams::new("sculpture")
        };
        let pairs = params.query_pairs();
        assert!(pairs.contains(&("difficulties", "3,4".to_string())));
        assert!(pairs.contains(&("categories", "Fine Arts".to_string())));
        assert!(!pairs.iter().any(|(name, _)| *name == "subcategories"));
    }

    #[test]
    fn decodes_database_payload() {
        let payload = r#"{
            "tossups": {"count": 1, "questionArray": [
                {"question": "<b>Name</b> this sculptor", "answer": "<b>Hepworth</b>",
                 "question_sanitized": "Name this sculptor", "answer_sanitized": "Hepworth",
                 "difficulty": 3}
            ]},
            "bonuses": {"count": 1, "questionArray": [
                {"leadin": "For 10 points each:", "parts": ["Raw part"], "answers": ["raw"],
                 "parts_sanitized": ["Clean part"]}
            ]}
        }"#;
        let results: QueryResults = serde_json::from_str(payload).unwrap();
        assert_eq!(results.question_count(), 2);

        let clean = results.sanitized();
        assert_eq!(
            clean.tossups.question_array[0],
            CleanTossup {
                question: "Name this sculptor".into(),
                answer: "Hepworth".into(),
            }
        );
        let bonus = &clean.bonuses.question_array[0];
        assert_eq!(bonus.leadin, "For 10 points each:");
        assert_eq!(bonus.parts, vec!["Clean part".to_string()]);
        assert_eq!(bonus.answer, vec!["raw".to_string()]);
    }

    #[test]
    fn missing_fields_fall_back_to_empty() {
        let results: QueryResults =
            serde_json::from_str(r#"{"tossups": {"questionArray": [{}]}}"#).unwrap();
        let clean = results.sanitized();
        assert_eq!(clean.tossups.question_array[0].question, "");
        assert!(clean.bonuses.question_array.is_empty());
    }

    #[test]
    fn empty_payload_is_empty() {
        let results: QueryResults = serde_json::from_str("{}").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn sanitized_results_serialize_in_database_shape() {
        let results = QueryResults {
            tossups: QuestionSet {
                question_array: vec![Tossup {
                    question: "q".into(),
                    answer: "a".into(),
                    ..Tossup::default()
                }],
            },
            ..QueryResults::default()
        };
        let json = serde_json::to_value(results.sanitized()).unwrap();
        assert_eq!(json["tossups"]["questionArray"][0]["question"], "q");
        assert_eq!(json["bonuses"]["questionArray"], serde_json::json!([]));
    }
}
