//! Category and difficulty labels accepted by the question database.

use anyhow::{Result, bail};

pub const CATEGORIES: &[&str] = &[
    "Literature",
    "History",
    "Science",
    "Fine Arts",
    "Religion",
    "Mythology",
    "Philosophy",
    "Social Science",
    "Current Events",
    "Geography",
    "Other Academic",
    "Trash",
];

pub const SUBCATEGORIES: &[(&str, &[&str])] = &[
    (
        "Literature",
        &[
            "American Literature",
            "British Literature",
            "Classical Literature",
            "European Literature",
            "World Literature",
            "Other Literature",
        ],
    ),
    (
        "History",
        &[
            "American History",
            "Ancient History",
            "European History",
            "World History",
            "Other History",
        ],
    ),
    (
        "Science",
        &["Biology", "Chemistry", "Physics", "Other Science"],
    ),
    (
        "Fine Arts",
        &["Visual Fine Arts", "Auditory Fine Arts", "Other Fine Arts"],
    ),
];

pub const ALTERNATE_SUBCATEGORIES: &[(&str, &[&str])] = &[
    (
        "Other Literature",
        &[
            "Drama",
            "Long Fiction",
            "Poetry",
            "Short Fiction",
            "Misc Literature",
        ],
    ),
    (
        "Other Science",
        &[
            "Math",
            "Astronomy",
            "Computer Science",
            "Earth Science",
            "Engineering",
            "Misc Science",
        ],
    ),
    (
        "Other Fine Arts",
        &[
            "Architecture",
            "Dance",
            "Film",
            "Jazz",
            "Opera",
            "Photography",
            "Misc Arts",
        ],
    ),
];

/// `(value sent to the database, label shown to the user)`
pub const DIFFICULTIES: &[(&str, &str)] = &[
    ("0", "0: Trash"),
    ("1", "1: Middle School"),
    ("2", "2: Easy High School"),
    ("3", "3: Regular High School"),
    ("4", "4: Hard High School"),
    ("5", "5: National High School"),
    ("6", "6: ● / Easy College"),
    ("7", "7: ●● / Medium College"),
    ("8", "8: ●●● / Regionals College"),
    ("9", "9: ●●●● / Nationals College"),
    ("10", "10: Open"),
];

fn children<'a>(table: &[(&str, &'a [&'a str])], parents: &[String]) -> Vec<&'a str> {
    parents
        .iter()
        .flat_map(|parent| {
            table
                .iter()
                .find(|(name, _)| *name == parent.as_str())
                .map(|(_, items)| *items)
                .unwrap_or_default()
        })
        .copied()
        .collect()
}

/// Subcategories offered for the selected categories, in selection order.
pub fn subcategories_for(categories: &[String]) -> Vec<&'static str> {
    children(SUBCATEGORIES, categories)
}

pub fn alternate_subcategories_for(subcategories: &[String]) -> Vec<&'static str> {
    children(ALTERNATE_SUBCATEGORIES, subcategories)
}

fn find_label(candidates: &[&'static str], value: &str) -> Option<&'static str> {
    candidates
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(value.trim()))
        .copied()
}

/// Checks a full selection and normalizes every label to its canonical
/// spelling. Subcategories must belong to a selected category, alternate
/// subcategories to a selected subcategory.
pub fn validate_selection(
    difficulties: &[String],
    categories: &[String],
    subcategories: &[String],
    alternate_subcategories: &[String],
) -> Result<QuerySelection> {
    let mut selection = QuerySelection::default();

    for difficulty in difficulties {
        let Some((value, _)) = DIFFICULTIES
            .iter()
            .find(|(value, _)| *value == difficulty.trim())
        else {
            bail!("Unknown difficulty '{difficulty}'. Expected a number from 0 to 10.");
        };
        selection.difficulties.push(value.to_string());
    }

    for category in categories {
        let Some(label) = find_label(CATEGORIES, category) else {
            bail!("Unknown category '{category}'. Run `qbcloze catalog` to list them.");
        };
        selection.categories.push(label.to_string());
    }

    let offered = subcategories_for(&selection.categories);
    for subcategory in subcategories {
        let Some(label) = find_label(&offered, subcategory) else {
            bail!("Subcategory '{subcategory}' does not belong to any selected category.");
        };
        selection.subcategories.push(label.to_string());
    }

    let offered = alternate_subcategories_for(&selection.subcategories);
    for alternate in alternate_subcategories {
        let Some(label) = find_label(&offered, alternate) else {
            bail!("Alternate subcategory '{alternate}' does not belong to any selected subcategory.");
        };
        selection.alternate_subcategories.push(label.to_string());
    }

    Ok(selection)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySelection {
    pub difficulties: Vec<String>,
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
    pub alternate_subcategories: Vec<String>,
}
