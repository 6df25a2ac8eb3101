//! Example caption preprocessing for a text-to-image GAN.
//!
//! Sentences written by a user are tokenized, mapped through the dataset
//! vocabulary and packed into zero-padded id matrices sorted by length, the
//! layout the text encoder expects for packed sequences.

pub mod config;
pub mod error;
pub mod model;
pub mod text;
pub mod utils;

pub use config::{EmptyExamplePolicy, ExampleConfig, RunConfig};
pub use error::{CaptionError, Result};
pub use model::data::{CaptionBatch, CaptionBatcher, CaptionItem};
pub use model::examples::{EncodedExample, ExampleEncoder, ExampleMap, ExampleStats, encode_examples};
pub use model::generation::{Algorithm, CaptionPreview, Mode, SplitPlan, dispatch};
pub use text::{CaptionTokenizer, TokenId, Vocabulary};
