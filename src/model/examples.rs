use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{EmptyExamplePolicy, ExampleConfig};
use crate::error::{CaptionError, Result};
use crate::model::constants::{PAD_INDEX, SENTENCE_FILE_EXT};
use crate::text::{CaptionTokenizer, TokenId, Vocabulary};
use crate::utils::{example_key, read_text};

/// Per-example account of what the tokenizer threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExampleStats {
    pub sentences: usize,
    pub skipped_sentences: usize,
    pub non_ascii_tokens: usize,
    pub unknown_tokens: usize,
    pub reserved_tokens: usize,
}

impl ExampleStats {
    pub fn dropped_tokens(&self) -> usize {
        self.non_ascii_tokens + self.unknown_tokens + self.reserved_tokens
    }
}

/// The sentences of one example as a zero-padded id matrix, rows ordered by
/// descending length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedExample {
    caption_matrix: Vec<Vec<TokenId>>,
    max_len: usize,
    lengths: Vec<usize>,
    sorted_indices: Vec<usize>,
    stats: ExampleStats,
}

impl EncodedExample {
    pub fn from_captions<S: AsRef<[TokenId]>>(
        name: &str,
        captions: &[S],
        stats: ExampleStats,
    ) -> Result<Self> {
        if captions.is_empty() {
            return Err(CaptionError::EmptyExample {
                name: name.to_string(),
            });
        }
        let sorted = sort_and_pad(captions);
        Ok(Self {
            caption_matrix: sorted.rows,
            max_len: sorted.max_len,
            lengths: sorted.lengths,
            sorted_indices: sorted.order,
            stats,
        })
    }

    pub fn caption_matrix(&self) -> &[Vec<TokenId>] {
        &self.caption_matrix
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// `sorted_indices()[i]` is the original position of the sentence in row `i`.
    pub fn sorted_indices(&self) -> &[usize] {
        &self.sorted_indices
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn num_sentences(&self) -> usize {
        self.caption_matrix.len()
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.num_sentences(), self.max_len]
    }

    pub fn stats(&self) -> &ExampleStats {
        &self.stats
    }

    /// Unpadded ids of row `i`.
    pub fn row_ids(&self, i: usize) -> Option<&[TokenId]> {
        let row = self.caption_matrix.get(i)?;
        Some(&row[..self.lengths[i]])
    }
}

pub(crate) struct SortedCaptions {
    pub rows: Vec<Vec<TokenId>>,
    pub max_len: usize,
    pub lengths: Vec<usize>,
    pub order: Vec<usize>,
}

/// Stable descending sort by length, then right padding with [`PAD_INDEX`].
pub(crate) fn sort_and_pad<S: AsRef<[TokenId]>>(captions: &[S]) -> SortedCaptions {
    let mut order: Vec<usize> = (0..captions.len()).collect();
    order.sort_by_key(|&ix| Reverse(captions[ix].as_ref().len()));

    let lengths: Vec<usize> = order.iter().map(|&ix| captions[ix].as_ref().len()).collect();
    let max_len = lengths.first().copied().unwrap_or(0);

    let rows = order
        .iter()
        .map(|&ix| {
            let caption = captions[ix].as_ref();
            let mut row = vec![PAD_INDEX; max_len];
            row[..caption.len()].copy_from_slice(caption);
            row
        })
        .collect();

    SortedCaptions {
        rows,
        max_len,
        lengths,
        order,
    }
}

/// Encoded examples keyed by example name, plus the names that were skipped
/// for having no usable sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExampleMap {
    examples: BTreeMap<String, EncodedExample>,
    skipped: Vec<String>,
}

impl ExampleMap {
    pub fn get(&self, key: &str) -> Option<&EncodedExample> {
        self.examples.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EncodedExample)> {
        self.examples.iter().map(|(key, example)| (key.as_str(), example))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.examples.keys().map(String::as_str)
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    // A key is either encoded or skipped, whichever manifest entry came last.
    fn insert(&mut self, key: String, example: EncodedExample) {
        let was_skipped = self.forget_skipped(&key);
        if self.examples.insert(key.clone(), example).is_some() || was_skipped {
            tracing::warn!("Example key '{}' appears more than once, keeping the last", key);
        }
    }

    fn skip(&mut self, key: String) {
        let was_skipped = self.forget_skipped(&key);
        if self.examples.remove(&key).is_some() || was_skipped {
            tracing::warn!("Example key '{}' appears more than once, keeping the last", key);
        }
        self.skipped.push(key);
    }

    fn forget_skipped(&mut self, key: &str) -> bool {
        let before = self.skipped.len();
        self.skipped.retain(|skipped| skipped != key);
        self.skipped.len() != before
    }
}

pub struct ExampleEncoder<'a> {
    vocab: &'a Vocabulary,
    tokenizer: CaptionTokenizer,
    config: &'a ExampleConfig,
}

impl<'a> ExampleEncoder<'a> {
    pub fn new(vocab: &'a Vocabulary, config: &'a ExampleConfig) -> Result<Self> {
        Ok(Self {
            vocab,
            tokenizer: CaptionTokenizer::new(&config.token_pattern)?,
            config,
        })
    }

    /// Encodes every example listed in the manifest of `data_dir`.
    pub fn encode_dir<P: AsRef<Path>>(&self, data_dir: P) -> Result<ExampleMap> {
        let data_dir = data_dir.as_ref();
        let manifest = data_dir.join(&self.config.manifest);
        let names: Vec<String> = read_text(&manifest)?
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        tracing::info!("Found {} examples in {}", names.len(), manifest.display());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()?;
        let results: Vec<Result<EncodedExample>> = pool.install(|| {
            names
                .par_iter()
                .map(|name| self.encode_file(data_dir, name))
                .collect()
        });

        let mut map = ExampleMap::default();
        for (name, result) in names.iter().zip(results) {
            let key = example_key(name).to_string();
            match result {
                Ok(example) => map.insert(key, example),
                Err(CaptionError::EmptyExample { .. })
                    if self.config.empty_policy == EmptyExamplePolicy::Skip =>
                {
                    tracing::warn!("Skipping example '{}': no usable sentences", name);
                    map.skip(key);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(map)
    }

    /// Encodes `<data_dir>/<name>.txt`.
    pub fn encode_file<P: AsRef<Path>>(&self, data_dir: P, name: &str) -> Result<EncodedExample> {
        let path = data_dir
            .as_ref()
            .join(format!("{name}.{SENTENCE_FILE_EXT}"));
        let text = read_text(&path)?;
        tracing::info!("Load from: {}", name);
        self.encode_sentences(name, text.lines())
    }

    pub fn encode_sentences<'s, I>(&self, name: &str, sentences: I) -> Result<EncodedExample>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut captions = Vec::new();
        let mut stats = ExampleStats::default();

        for sentence in sentences.into_iter().filter(|s| !s.is_empty()) {
            match self.tokenizer.encode(sentence, self.vocab) {
                Some(encoded) => {
                    stats.sentences += 1;
                    stats.non_ascii_tokens += encoded.non_ascii;
                    stats.unknown_tokens += encoded.unknown;
                    stats.reserved_tokens += encoded.reserved;
                    captions.push(encoded.ids);
                }
                None => {
                    tracing::warn!("No tokens in sentence of '{}': {:?}", name, sentence);
                    stats.skipped_sentences += 1;
                }
            }
        }

        tracing::info!(
            "Example '{}': {} sentences, {} skipped, {} tokens dropped ({} non-ascii, {} unknown, {} padding id)",
            name,
            stats.sentences,
            stats.skipped_sentences,
            stats.dropped_tokens(),
            stats.non_ascii_tokens,
            stats.unknown_tokens,
            stats.reserved_tokens,
        );
        EncodedExample::from_captions(name, &captions, stats)
    }
}

/// Builds the example map for `data_dir` with the given vocabulary.
pub fn encode_examples<P: AsRef<Path>>(
    vocab: &Vocabulary,
    data_dir: P,
    config: &ExampleConfig,
) -> Result<ExampleMap> {
    ExampleEncoder::new(vocab, config)?.encode_dir(data_dir)
}
