use std::sync::Arc;

use crate::card::{Card, CardId};
use crate::error::GeneratorError;

/// Ordered cards plus the id counter that issued them.
///
/// Values are never modified after construction: every operation returns a
/// replacement, so a renderer holding an older snapshot can diff against the
/// new one. Ids are never reused, not even after `clear`.
#[derive(Clone, Debug)]
pub struct CardCollection {
    cards: Arc<[Card]>,
    next_id: CardId,
}

impl Default for CardCollection {
    fn default() -> Self {
        Self {
            cards: Arc::from(Vec::new()),
            next_id: CardId::default(),
        }
    }
}

impl CardCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn next_id(&self) -> CardId {
        self.next_id
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn position(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|card| card.id == id)
    }

    /// Builds cards for `contents` with ids drawn from this collection's
    /// counter, ready for `insert_front`.
    pub fn allocate_cards<I, S>(&self, contents: I) -> Vec<Card>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut id = self.next_id;
        contents
            .into_iter()
            .map(|content| {
                let card = Card::new(id, content);
                id = id.next();
                card
            })
            .collect()
    }

    /// Prepends `new_cards` in their given order.
    ///
    /// The batch must carry the next consecutive ids from the counter
    /// (see `allocate_cards`); the counter then advances by the batch size.
    #[must_use]
    pub fn insert_front(&self, new_cards: Vec<Card>) -> Self {
        if new_cards.is_empty() {
            return self.clone();
        }
        debug_assert!(
            new_cards
                .iter()
                .enumerate()
                .all(|(i, card)| card.id.0 == self.next_id.0 + i as u64),
            "inserted ids must come from allocate_cards"
        );

        let next_id = CardId(self.next_id.0 + new_cards.len() as u64);
        let cards: Vec<Card> = new_cards
            .into_iter()
            .chain(self.cards.iter().cloned())
            .collect();
        Self {
            cards: cards.into(),
            next_id,
        }
    }

    /// Prepends one blank card with a fresh id.
    #[must_use]
    pub fn insert_one(&self) -> Self {
        self.insert_front(vec![Card::blank(self.next_id)])
    }

    pub fn replace_content(
        &self,
        id: CardId,
        content: impl Into<String>,
    ) -> Result<Self, GeneratorError> {
        let idx = self.position(id).ok_or(GeneratorError::UnknownCard(id))?;
        let mut cards = self.cards.to_vec();
        cards[idx].content = content.into();
        Ok(Self {
            cards: cards.into(),
            next_id: self.next_id,
        })
    }

    /// Removes the card with `id`. Unknown ids leave the collection as is.
    #[must_use]
    pub fn remove_one(&self, id: CardId) -> Self {
        if self.position(id).is_none() {
            return self.clone();
        }
        let cards: Vec<Card> = self
            .cards
            .iter()
            .filter(|card| card.id != id)
            .cloned()
            .collect();
        Self {
            cards: cards.into(),
            next_id: self.next_id,
        }
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        Self {
            cards: Arc::from(Vec::new()),
            next_id: self.next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(collection: &CardCollection) -> Vec<&str> {
        collection
            .cards()
            .iter()
            .map(|card| card.content.as_str())
            .collect()
    }

    fn collection_of(items: &[&str]) -> CardCollection {
        let empty = CardCollection::new();
        let cards = empty.allocate_cards(items.iter().copied());
        empty.insert_front(cards)
    }

    #[test]
    fn insert_front_keeps_both_blocks_in_order() {
        let existing = collection_of(&["old1", "old2"]);
        let new_cards = existing.allocate_cards(["new1", "new2"]);
        let updated = existing.insert_front(new_cards);

        assert_eq!(contents(&updated), vec!["new1", "new2", "old1", "old2"]);
        assert_eq!(contents(&existing), vec!["old1", "old2"]);
    }

    #[test]
    fn counter_advances_by_batch_size() {
        let collection = collection_of(&["a", "b", "c"]);
        assert_eq!(collection.next_id(), CardId(3));
        let ids: Vec<_> = collection.cards().iter().map(|card| card.id).collect();
        assert_eq!(ids, vec![CardId(0), CardId(1), CardId(2)]);

        let unchanged = collection.insert_front(Vec::new());
        assert_eq!(unchanged.next_id(), CardId(3));
    }

    #[test]
    fn insert_one_prepends_blank_card() {
        let collection = collection_of(&["a"]);
        let updated = collection.insert_one();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated.cards()[0], Card::blank(CardId(1)));
        assert_eq!(updated.next_id(), CardId(2));
    }

    #[test]
    fn replace_content_touches_only_target() {
        let collection = collection_of(&["a", "b", "c"]);
        let updated = collection
            .replace_content(CardId(1), "{{c1::b}}")
            .unwrap();
        assert_eq!(contents(&updated), vec!["a", "{{c1::b}}", "c"]);
        assert_eq!(contents(&collection), vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_content_reports_unknown_id() {
        let collection = collection_of(&["a"]);
        let err = collection.replace_content(CardId(9), "x").unwrap_err();
        assert_eq!(err, GeneratorError::UnknownCard(CardId(9)));
    }

    #[test]
    fn remove_one_removes_exactly_that_id() {
        let collection = collection_of(&["a", "b", "c"]);
        let updated = collection.remove_one(CardId(1));
        assert_eq!(contents(&updated), vec!["a", "c"]);

        let same = updated.remove_one(CardId(42));
        assert_eq!(contents(&same), vec!["a", "c"]);
    }

    #[test]
    fn ids_are_not_reused_after_delete_or_clear() {
        let collection = collection_of(&["a", "b"]);
        let removed = collection.remove_one(CardId(1));
        let refilled = removed.insert_one();
        assert_eq!(refilled.cards()[0].id, CardId(2));

        let cleared = refilled.clear();
        assert!(cleared.is_empty());
        let after_clear = cleared.insert_one();
        assert_eq!(after_clear.cards()[0].id, CardId(3));
    }
}
