use std::path::{Path, PathBuf};

use burn::prelude::*;

use crate::config::RunConfig;
use crate::error::{CaptionError, Result};
use crate::model::constants::NUM_BBOX_SAMPLES;
use crate::model::examples::{ExampleMap, encode_examples};
use crate::text::Vocabulary;

/// The network side of a run. Implementations own the generator and
/// discriminator; this crate only prepares their inputs.
pub trait Algorithm {
    fn train(&mut self) -> Result<()>;

    fn visualize_bbox(&mut self, split: &str, num_samples: usize, draw_bbox: bool) -> Result<()>;

    fn sampling(&mut self, split: &str) -> Result<()>;

    /// Generates images for user-authored captions.
    fn gen_example(&mut self, examples: &ExampleMap) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Validate,
    Examples,
}

impl Mode {
    pub fn from_config(config: &RunConfig) -> Self {
        if config.train.flag {
            Mode::Train
        } else if config.b_validation {
            Mode::Validate
        } else {
            Mode::Examples
        }
    }
}

/// Dataset split handed to the image loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub split: &'static str,
    pub image_dir: PathBuf,
    pub shuffle: bool,
    pub image_size: usize,
}

impl SplitPlan {
    pub fn from_config(config: &RunConfig) -> Self {
        let (split, images) = if config.train.flag {
            ("train", "train2014")
        } else {
            ("test", "val2014")
        };
        Self {
            split,
            image_dir: Path::new(&config.data_dir).join(split).join(images),
            shuffle: config.train.flag,
            image_size: config.tree.image_size(),
        }
    }
}

/// Runs the mode selected by `config`. Example captions are only read when
/// the example mode is selected.
pub fn dispatch<A: Algorithm>(
    algo: &mut A,
    config: &RunConfig,
    vocab: &Vocabulary,
) -> Result<Mode> {
    let mode = Mode::from_config(config);
    let plan = SplitPlan::from_config(config);
    tracing::info!("Running {:?} on split '{}'", mode, plan.split);

    match mode {
        Mode::Train => algo.train()?,
        Mode::Validate => {
            algo.visualize_bbox(plan.split, NUM_BBOX_SAMPLES, true)?;
            algo.sampling(plan.split)?;
        }
        Mode::Examples => {
            let examples = encode_examples(vocab, &config.data_dir, &config.examples)?;
            algo.gen_example(&examples)?;
        }
    }
    Ok(mode)
}

/// Stand-in algorithm that batches each example onto a device and reports
/// the shapes, optionally writing the encoded examples as JSON.
pub struct CaptionPreview<B: Backend> {
    device: B::Device,
    dump: Option<PathBuf>,
}

impl<B: Backend> CaptionPreview<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device, dump: None }
    }

    pub fn with_dump(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump = Some(path.into());
        self
    }
}

impl<B: Backend> Algorithm for CaptionPreview<B> {
    fn train(&mut self) -> Result<()> {
        Err(CaptionError::Unsupported("training"))
    }

    fn visualize_bbox(&mut self, _split: &str, _num_samples: usize, _draw_bbox: bool) -> Result<()> {
        Err(CaptionError::Unsupported("bounding box visualization"))
    }

    fn sampling(&mut self, _split: &str) -> Result<()> {
        Err(CaptionError::Unsupported("sampling"))
    }

    fn gen_example(&mut self, examples: &ExampleMap) -> Result<()> {
        for (key, example) in examples.iter() {
            let batch = example.to_batch::<B>(&self.device);
            tracing::info!(
                "{}: captions {:?}, lengths {:?}, order {:?}",
                key,
                batch.captions.dims(),
                example.lengths(),
                example.sorted_indices(),
            );
        }
        if !examples.skipped().is_empty() {
            tracing::warn!("Skipped examples: {}", examples.skipped().join(", "));
        }

        if let Some(path) = &self.dump {
            let json = serde_json::to_string_pretty(examples)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            std::fs::write(path, json)?;
            tracing::info!("Wrote {} encoded examples to {}", examples.len(), path.display());
        }
        Ok(())
    }
}
