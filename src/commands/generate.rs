use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dialoguer::{Input, MultiSelect, theme::ColorfulTheme};

use crate::catalog::{
    CATEGORIES, DIFFICULTIES, QuerySelection, alternate_subcategories_for, subcategories_for,
    validate_selection,
};
use crate::collection::CardCollection;
use crate::commands::review::{self, Resubmit};
use crate::export::{default_export_dir, export_path, write_export};
use crate::llm::{OpenAiCompletion, capture_credential};
use crate::palette::Palette;
use crate::qbreader::{QbReaderClient, QueryParams, QuestionType, SearchType};
use crate::submit::submit;
use crate::utils::{ask_yn, pluralize};

#[derive(Clone, Debug, Default)]
pub struct GenerateOptions {
    pub query: Option<String>,
    pub difficulties: Vec<String>,
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
    pub alternate_subcategories: Vec<String>,
    pub pick: bool,
    pub question_type: QuestionType,
    pub search_type: SearchType,
    pub case_sensitive: bool,
    pub exact_phrase: bool,
    pub max_results: u32,
    pub model: String,
    pub output: Option<PathBuf>,
    pub plain: bool,
}

impl GenerateOptions {
    fn params(&self, query: String, selection: QuerySelection) -> QueryParams {
        QueryParams {
            query_string: query,
            question_type: self.question_type,
            search_type: self.search_type,
            case_sensitive: self.case_sensitive,
            exact_phrase: self.exact_phrase,
            difficulties: selection.difficulties,
            categories: selection.categories,
            subcategories: selection.subcategories,
            alternate_subcategories: selection.alternate_subcategories,
            max_return_length: self.max_results,
        }
    }

    fn opens_editor(&self) -> bool {
        self.output.is_none() && !self.plain
    }
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let interactive = io::stdin().is_terminal();

    let query = match options.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => query.to_string(),
        _ if interactive => prompt_query()?,
        _ => bail!("A query is required when not running in a terminal."),
    };

    let selection = if options.pick {
        pick_selection()?
    } else {
        validate_selection(
            &options.difficulties,
            &options.categories,
            &options.subcategories,
            &options.alternate_subcategories,
        )?
    };
    let params = options.params(query, selection);

    let credential = match capture_credential(interactive)? {
        Some((credential, source)) => {
            println!(
                "{}",
                Palette::dim(format!("Using the API key from the {}.", source.description()))
            );
            Some(credential)
        }
        None => None,
    };

    let database = Arc::new(QbReaderClient::new());
    let completion = Arc::new(OpenAiCompletion::new(options.model.clone()));

    let outcome = submit(
        database.as_ref(),
        completion.as_ref(),
        &params,
        credential.as_ref(),
        &CardCollection::new(),
        |stage| println!("{}", Palette::progress(stage.describe())),
    )
    .await;

    if !options.opens_editor() {
        let applied = outcome?;
        report_added(applied.added, applied.rejected);
        if let Some(target) = &options.output {
            let existing = export_path(target);
            if existing.is_file()
                && interactive
                && !ask_yn(&format!("{} already exists. Overwrite?", existing.display()))?
            {
                println!("Aborting; nothing exported.");
                return Ok(());
            }
            let path = write_export(target, applied.collection.cards())?;
            println!(
                "Exported {} to {}",
                pluralize("card", applied.collection.len()),
                Palette::path(path.display())
            );
        } else {
            for card in applied.collection.cards() {
                println!("{}", card.content);
            }
        }
        return Ok(());
    }

    let (collection, notice) = match outcome {
        Ok(applied) => {
            report_added(applied.added, applied.rejected);
            (applied.collection, None)
        }
        Err(err) => (CardCollection::new(), Some(err)),
    };

    let resubmit = Resubmit {
        database,
        completion,
        params,
        credential,
    };
    let kept = review::run(collection, default_export_dir(), Some(resubmit), notice).await?;
    println!("Session closed with {}.", pluralize("card", kept.len()));
    Ok(())
}

fn report_added(added: usize, rejected: usize) {
    println!(
        "{}",
        Palette::success(format!("Generated {}.", pluralize("card", added)))
    );
    if rejected > 0 {
        println!(
            "{}",
            Palette::dim(format!("Skipped {}.", pluralize("malformed line", rejected)))
        );
    }
}

fn prompt_query() -> Result<String> {
    let query: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Query")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("The query cannot be empty.")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read the query")?;
    Ok(query.trim().to_string())
}

/// Walks the catalog top-down; each level only offers children of what was
/// picked above it.
fn pick_selection() -> Result<QuerySelection> {
    let labels: Vec<&str> = DIFFICULTIES.iter().map(|(_, label)| *label).collect();
    let difficulties: Vec<String> = pick_indices("Difficulties", &labels)?
        .into_iter()
        .map(|idx| DIFFICULTIES[idx].0.to_string())
        .collect();

    let categories = pick_labels("Categories", CATEGORIES)?;
    let subcategories = pick_labels("Subcategories", &subcategories_for(&categories))?;
    let alternates = pick_labels(
        "Alternate subcategories",
        &alternate_subcategories_for(&subcategories),
    )?;

    validate_selection(&difficulties, &categories, &subcategories, &alternates)
}

fn pick_labels(prompt: &str, items: &[&str]) -> Result<Vec<String>> {
    Ok(pick_indices(prompt, items)?
        .into_iter()
        .map(|idx| items[idx].to_string())
        .collect())
}

fn pick_indices(prompt: &str, items: &[&str]) -> Result<Vec<usize>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{prompt} (space to toggle, enter for any)"))
        .items(items)
        .interact()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;

    #[test]
    fn params_carry_flags_and_selection() {
        let options = GenerateOptions {
            exact_phrase: true,
            max_results: 10,
            question_type: QuestionType::Tossup,
            ..GenerateOptions::default()
        };
        let selection = QuerySelection {
            categories: vec!["Science".to_string()],
            ..QuerySelection::default()
        };
        let params = options.params("Mozart".to_string(), selection);
        assert_eq!(params.query_string, "Mozart");
        assert!(params.exact_phrase);
        assert_eq!(params.max_return_length, 10);
        assert_eq!(params.question_type, QuestionType::Tossup);
        assert_eq!(params.categories, vec!["Science"]);
    }

    #[test]
    fn output_or_plain_skip_the_editor() {
        let mut options = GenerateOptions::default();
        assert!(options.opens_editor());
        options.plain = true;
        assert!(!options.opens_editor());
        options.plain = false;
        options.output = Some(PathBuf::from("cards.txt"));
        assert!(!options.opens_editor());
    }

    #[test]
    fn submission_errors_render_as_one_line() {
        let err: anyhow::Error = GeneratorError::UpstreamEmpty.into();
        assert_eq!(format!("{err:#}"), "No results found in the database.");
    }
}
