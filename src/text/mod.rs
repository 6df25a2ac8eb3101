pub mod tokenizer;
pub mod vocab;

pub use tokenizer::{CaptionTokenizer, SentenceIds};
pub use vocab::{TokenId, Vocabulary};
