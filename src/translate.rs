use crate::card::Card;
use crate::cloze::has_well_formed_marker;
use crate::collection::CardCollection;
use crate::error::GeneratorError;
use crate::utils::trim_line;

const CLOZE_OPEN: &str = "{{c";

/// Cards parsed out of one model response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translation {
    pub cards: Vec<Card>,
    /// Lines that opened a cloze but held no complete marker.
    pub rejected: usize,
}

impl Translation {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Turns "nothing usable" into an error the user can tell apart from a
    /// failed request.
    pub fn into_nonempty(self) -> Result<Self, GeneratorError> {
        if self.cards.is_empty() {
            return Err(GeneratorError::EmptyTranslation {
                rejected: self.rejected,
            });
        }
        Ok(self)
    }
}

/// One card per response line that carries a cloze marker.
///
/// Ids come from `collection`'s counter in source-line order, so the result
/// can go straight into `CardCollection::insert_front`.
pub fn translate(raw: &str, collection: &CardCollection) -> Translation {
    let mut rejected = 0;
    let mut kept = Vec::new();

    for line in raw.lines().filter_map(trim_line) {
        if !line.contains(CLOZE_OPEN) {
            continue;
        }
        if !has_well_formed_marker(line) {
            rejected += 1;
            continue;
        }
        kept.push(line);
    }

    Translation {
        cards: collection.allocate_cards(kept),
        rejected,
    }
}
