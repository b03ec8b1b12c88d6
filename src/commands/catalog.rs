use std::fmt::Write;

use crate::catalog::{ALTERNATE_SUBCATEGORIES, CATEGORIES, DIFFICULTIES, SUBCATEGORIES};
use crate::palette::Palette;

pub fn run() {
    print!("{}", render());
}

fn render() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", Palette::path("Difficulties"));
    for (value, label) in DIFFICULTIES {
        let _ = writeln!(out, "  {value:>2}  {}", Palette::dim(label));
    }

    let _ = writeln!(out, "\n{}", Palette::path("Categories"));
    for category in CATEGORIES {
        let _ = writeln!(out, "  {category}");
        for subcategory in children(SUBCATEGORIES, category) {
            let _ = writeln!(out, "    {subcategory}");
            for alternate in children(ALTERNATE_SUBCATEGORIES, subcategory) {
                let _ = writeln!(out, "      {}", Palette::dim(alternate));
            }
        }
    }
    out
}

fn children(table: &[(&str, &'static [&'static str])], parent: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|(name, _)| *name == parent)
        .map(|(_, items)| *items)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_nest_under_their_subcategory() {
        let text = render();
        let other_lit = text.find("    Other Literature").unwrap();
        let drama = text.find("Drama").unwrap();
        let history = text.find("  History").unwrap();
        assert!(other_lit < drama);
        assert!(drama < history);
    }

    #[test]
    fn lists_every_difficulty() {
        let text = render();
        assert!(text.contains("Trash"));
        assert!(text.contains("Open"));
    }
}
