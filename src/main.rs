use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueHint};

use qbcloze::commands::generate::{self, GenerateOptions};
use qbcloze::commands::{catalog, edit};
use qbcloze::llm::{self, DEFAULT_MODEL};
use qbcloze::palette::Palette;
use qbcloze::qbreader::{DEFAULT_MAX_RETURN_LENGTH, QuestionType, SearchType};

#[derive(Parser, Debug)]
#[command(
    name = "qbcloze",
    version,
    about = "Turn quizbowl questions into Anki cloze cards.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query QB Reader, generate cloze cards and open them in the editor
    Generate {
        /// Answerline or topic to search for. Prompted for when omitted.
        #[arg(value_name = "QUERY")]
        query: Option<String>,
        /// Difficulty level from 0 to 10. Repeat for several.
        #[arg(long = "difficulty", value_name = "LEVEL")]
        difficulties: Vec<String>,
        /// Category label, e.g. "Fine Arts". Repeat for several.
        #[arg(long = "category", value_name = "NAME")]
        categories: Vec<String>,
        /// Subcategory of a selected category.
        #[arg(long = "subcategory", value_name = "NAME")]
        subcategories: Vec<String>,
        /// Alternate subcategory of a selected subcategory.
        #[arg(long = "alternate-subcategory", value_name = "NAME")]
        alternate_subcategories: Vec<String>,
        /// Choose difficulties and categories from interactive menus
        #[arg(
            long,
            default_value_t = false,
            conflicts_with_all = ["difficulties", "categories", "subcategories", "alternate_subcategories"]
        )]
        pick: bool,
        #[arg(long, value_enum, default_value_t = QuestionType::All)]
        question_type: QuestionType,
        #[arg(long, value_enum, default_value_t = SearchType::All)]
        search_type: SearchType,
        #[arg(long, default_value_t = false)]
        case_sensitive: bool,
        #[arg(long, default_value_t = false)]
        exact_phrase: bool,
        /// Maximum number of questions of each type to send to the model
        #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_RETURN_LENGTH)]
        max_results: u32,
        #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL)]
        model: String,
        /// Export straight to this file or directory instead of opening the editor
        #[arg(long, value_name = "PATH", value_hint = ValueHint::AnyPath, conflicts_with = "plain")]
        output: Option<PathBuf>,
        /// Print the generated cards instead of opening the editor
        #[arg(long, default_value_t = false)]
        plain: bool,
    },
    /// Edit a previously exported card file
    Edit {
        #[arg(value_name = "PATH", value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    /// List difficulties, categories and subcategories
    Catalog,
    /// Manage LLM helper settings
    Llm {
        /// Verify the API key by calling the OpenAI API
        #[arg(long)]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            query,
            difficulties,
            categories,
            subcategories,
            alternate_subcategories,
            pick,
            question_type,
            search_type,
            case_sensitive,
            exact_phrase,
            max_results,
            model,
            output,
            plain,
        } => {
            generate::run(GenerateOptions {
                query,
                difficulties,
                categories,
                subcategories,
                alternate_subcategories,
                pick,
                question_type,
                search_type,
                case_sensitive,
                exact_phrase,
                max_results,
                model,
                output,
                plain,
            })
            .await?;
        }
        Command::Edit { path } => edit::run(path).await?,
        Command::Catalog => catalog::run(),
        Command::Llm { test } => handle_llm_command(test).await?,
    }

    Ok(())
}

async fn handle_llm_command(test: bool) -> Result<()> {
    if !test {
        bail!("No action provided. Use --test.");
    }
    let Some((credential, source)) = llm::capture_credential(true)? else {
        bail!("No API key provided. Set {} or enter one when prompted.", llm::API_KEY_ENV);
    };
    llm::test_credential(&credential).await?;
    println!(
        "{}",
        Palette::success(format!(
            "OpenAI API key from the {} is valid.",
            source.description()
        ))
    );
    Ok(())
}
