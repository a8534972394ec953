//! Word is a pair <term, translation>. Only text is used in terms and translations
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row id of a word in the `words` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(pub i64);

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub term: String,
    pub translation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_creation() {
        let word = Word {
            id: WordId(1),
            term: "cześć".to_string(),
            translation: "hello".to_string(),
        };

        assert_eq!(word.term, "cześć");
        assert_eq!(word.translation, "hello");
        assert_eq!(word.id.to_string(), "1");
    }

    #[test]
    fn test_word_id_serializes_as_number() {
        let json = serde_json::to_string(&WordId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
