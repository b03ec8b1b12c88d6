use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::collection::CardCollection;
use crate::commands::review;
use crate::export::read_export;
use crate::palette::Palette;
use crate::utils::pluralize;

/// Reopens a previously exported file; Ctrl+S writes back to the same path.
pub async fn run(path: PathBuf) -> Result<()> {
    if !path.is_file() {
        bail!("No exported cards at {}", path.display());
    }
    let collection = load(&read_export(&path)?);
    println!(
        "Loaded {} from {}",
        pluralize("card", collection.len()),
        Palette::path(path.display())
    );

    let kept = review::run(collection, path, None, None).await?;
    println!("Session closed with {}.", pluralize("card", kept.len()));
    Ok(())
}

fn load(contents: &[String]) -> CardCollection {
    let empty = CardCollection::new();
    let cards = empty.allocate_cards(contents.iter().map(String::as_str));
    empty.insert_front(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_export;
    use tempfile::tempdir;

    #[test]
    fn exported_file_loads_in_order_with_blank_cards() {
        let dir = tempdir().unwrap();
        let exported = load(&[
            "{{c1::Hepworth}} carved Single Form".to_string(),
            String::new(),
            "line one\nline two {{c1::x}}".to_string(),
        ]);
        let path = write_export(dir.path(), exported.cards()).unwrap();

        let reloaded = load(&read_export(&path).unwrap());
        let contents: Vec<_> = reloaded
            .cards()
            .iter()
            .map(|card| card.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec![
                "{{c1::Hepworth}} carved Single Form",
                "",
                "line one\nline two {{c1::x}}"
            ]
        );
        assert_eq!(reloaded.next_id().0, 3);
    }
}
