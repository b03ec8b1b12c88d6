use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub u64);

impl CardId {
    pub fn next(self) -> Self {
        CardId(self.0 + 1)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub content: String,
}

impl Card {
    pub fn new(id: CardId, content: impl Into<String>) -> Self {
        Card {
            id,
            content: content.into(),
        }
    }

    pub fn blank(id: CardId) -> Self {
        Self::new(id, String::new())
    }
}
