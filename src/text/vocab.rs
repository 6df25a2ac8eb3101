use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CaptionError, Result};
use crate::model::constants::PAD_INDEX;
use crate::utils::read_text;

pub type TokenId = u32;

/// Word to index mapping owned by the dataset. Index 0 is the padding value
/// of every caption matrix, so no word the tokenizer can emit may use it.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    word_to_ix: HashMap<String, TokenId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VocabFile {
    WordToIx(HashMap<String, TokenId>),
    IxToWord(Vec<String>),
}

impl Vocabulary {
    pub fn from_map(word_to_ix: HashMap<String, TokenId>) -> Result<Self> {
        if let Some((word, _)) = word_to_ix
            .iter()
            .find(|(word, ix)| **ix == PAD_INDEX && is_token_shaped(word))
        {
            return Err(CaptionError::PaddingCollision { word: word.clone() });
        }
        Ok(Self { word_to_ix })
    }

    /// Builds the vocabulary from an index-ordered word list, the way the
    /// dataset stores `ixtoword`. A later duplicate overrides an earlier one.
    pub fn from_ixtoword<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let word_to_ix = words
            .iter()
            .enumerate()
            .map(|(ix, word)| Ok((word.as_ref().to_string(), token_id(ix, words.len())?)))
            .collect::<Result<_>>()?;
        Self::from_map(word_to_ix)
    }

    /// Reads a JSON vocabulary: either an object of `word: index` pairs or an
    /// array of words where the position is the index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = read_text(path)?;
        let parsed: VocabFile =
            serde_json::from_str(&raw).map_err(|source| CaptionError::VocabularyFormat {
                path: path.to_path_buf(),
                source,
            })?;
        let vocab = match parsed {
            VocabFile::WordToIx(map) => Self::from_map(map)?,
            VocabFile::IxToWord(words) => Self::from_ixtoword(&words)?,
        };
        tracing::info!("Loaded vocabulary of {} words from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    pub fn get(&self, token: &str) -> Option<TokenId> {
        self.word_to_ix.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.word_to_ix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_ix.is_empty()
    }
}

fn token_id(ix: usize, total: usize) -> Result<TokenId> {
    TokenId::try_from(ix).map_err(|_| CaptionError::VocabularyTooLarge(total))
}

// Could this word come out of the caption tokenizer?
fn is_token_shaped(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_token_may_hold_index_zero() {
        let vocab = Vocabulary::from_ixtoword(&["<end>", "a", "bird"]).unwrap();
        assert_eq!(vocab.get("<end>"), Some(0));
        assert_eq!(vocab.get("bird"), Some(2));
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn word_at_padding_index_is_rejected() {
        let err = Vocabulary::from_ixtoword(&["the", "bird"]).unwrap_err();
        assert!(matches!(err, CaptionError::PaddingCollision { word } if word == "the"));
    }

    #[test]
    fn uppercase_words_cannot_collide() {
        // the tokenizer lowercases, so "The" is unreachable
        let map = HashMap::from([("The".to_string(), 0), ("bird".to_string(), 1)]);
        assert!(Vocabulary::from_map(map).is_ok());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn position_beyond_token_id_range_is_rejected() {
        let last = TokenId::MAX as usize;
        assert_eq!(token_id(last, last + 1).unwrap(), TokenId::MAX);
        assert!(matches!(
            token_id(last + 1, last + 2),
            Err(CaptionError::VocabularyTooLarge(n)) if n == last + 2
        ));
    }

    #[test]
    fn unknown_word_is_none() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_empty());
        assert_eq!(vocab.get("bird"), None);
    }
}
