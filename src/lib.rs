pub mod card;
pub mod catalog;
pub mod cloze;
pub mod collection;
pub mod commands;
pub mod error;
pub mod export;
pub mod llm;
pub mod palette;
pub mod qbreader;
pub mod submit;
pub mod translate;
pub mod tui;
pub mod utils;
