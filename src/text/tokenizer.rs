use std::borrow::Cow;

use regex::Regex;

use crate::error::Result;
use crate::model::constants::PAD_INDEX;
use crate::text::vocab::{TokenId, Vocabulary};

/// Doubled replacement character left behind by broken encodings.
const CORRUPTION_MARKER: &str = "\u{FFFD}\u{FFFD}";

/// Ids that survived vocabulary lookup for one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceIds {
    pub ids: Vec<TokenId>,
    /// Tokens that were empty once reduced to ASCII.
    pub non_ascii: usize,
    /// Tokens missing from the vocabulary.
    pub unknown: usize,
    /// Tokens whose id is the padding index, possible with a custom pattern.
    pub reserved: usize,
}

#[derive(Debug, Clone)]
pub struct CaptionTokenizer {
    pattern: Regex,
}

impl CaptionTokenizer {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn tokenize(&self, sentence: &str) -> Vec<String> {
        let cleaned = clean(sentence);
        let lowered = cleaned.to_lowercase();
        self.pattern
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Returns `None` when the sentence has no tokens at all. Tokens that are
    /// filtered afterwards still leave a (possibly empty) id sequence.
    pub fn encode(&self, sentence: &str, vocab: &Vocabulary) -> Option<SentenceIds> {
        let tokens = self.tokenize(sentence);
        if tokens.is_empty() {
            return None;
        }

        let mut out = SentenceIds::default();
        for token in tokens {
            let ascii = strip_non_ascii(&token);
            if ascii.is_empty() {
                out.non_ascii += 1;
                continue;
            }
            match vocab.get(&ascii) {
                Some(PAD_INDEX) => out.reserved += 1,
                Some(ix) => out.ids.push(ix),
                None => out.unknown += 1,
            }
        }
        Some(out)
    }
}

fn clean(sentence: &str) -> Cow<'_, str> {
    if sentence.contains(CORRUPTION_MARKER) {
        Cow::Owned(sentence.replace(CORRUPTION_MARKER, " "))
    } else {
        Cow::Borrowed(sentence)
    }
}

fn strip_non_ascii(token: &str) -> String {
    token.chars().filter(char::is_ascii).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constants::TOKEN_PATTERN;

    fn tokenizer() -> CaptionTokenizer {
        CaptionTokenizer::new(TOKEN_PATTERN).unwrap()
    }

    fn vocab() -> Vocabulary {
        Vocabulary::from_ixtoword(&["<end>", "a", "bird", "flies", "cafe"]).unwrap()
    }

    #[test]
    fn splits_on_word_boundaries_and_lowercases() {
        assert_eq!(
            tokenizer().tokenize("A small-bird, FLIES_away!"),
            vec!["a", "small", "bird", "flies_away"]
        );
    }

    #[test]
    fn corruption_marker_separates_words() {
        assert_eq!(
            tokenizer().tokenize("bird\u{FFFD}\u{FFFD}flies"),
            vec!["bird", "flies"]
        );
    }

    #[test]
    fn punctuation_only_sentence_has_no_tokens() {
        assert_eq!(tokenizer().encode("?! ... ¿¿", &vocab()), None);
        assert_eq!(tokenizer().encode("   ", &vocab()), None);
    }

    #[test]
    fn encodes_known_words_in_order() {
        let encoded = tokenizer().encode("A bird flies", &vocab()).unwrap();
        assert_eq!(encoded.ids, vec![1, 2, 3]);
        assert_eq!(encoded.unknown, 0);
        assert_eq!(encoded.non_ascii, 0);
    }

    #[test]
    fn drops_unknown_and_non_ascii_tokens() {
        let encoded = tokenizer()
            .encode("a 鳥 bird sings café", &vocab())
            .unwrap();
        // "café" loses its accent and becomes "caf", which is unknown
        assert_eq!(encoded.ids, vec![1, 2]);
        assert_eq!(encoded.non_ascii, 1);
        assert_eq!(encoded.unknown, 2);
    }

    #[test]
    fn padding_id_never_enters_a_sequence() {
        let vocab = Vocabulary::from_ixtoword(&["<end>", "a", "bird"]).unwrap();
        let tokenizer = CaptionTokenizer::new(r"\S+").unwrap();
        let encoded = tokenizer.encode("a <end> bird", &vocab).unwrap();
        assert_eq!(encoded.ids, vec![1, 2]);
        assert_eq!(encoded.reserved, 1);
        assert_eq!(encoded.unknown, 0);
    }

    #[test]
    fn filtered_sentence_keeps_empty_sequence() {
        let encoded = tokenizer()
            .encode("xyz123 ¿¿", &Vocabulary::default())
            .unwrap();
        assert!(encoded.ids.is_empty());
        assert_eq!(encoded.unknown, 1);
    }
}
