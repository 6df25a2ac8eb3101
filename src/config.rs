use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::constants::{EXAMPLE_MANIFEST, TOKEN_PATTERN};

/// What to do with an example whose sentences all tokenized to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptyExamplePolicy {
    /// Warn, record the example as skipped and keep going.
    #[default]
    Skip,
    /// Fail the whole run.
    Abort,
}

#[derive(Config, Debug)]
pub struct ExampleConfig {
    #[config(default = "EXAMPLE_MANIFEST.to_string()")]
    pub manifest: String,

    #[config(default = "TOKEN_PATTERN.to_string()")]
    pub token_pattern: String,

    #[config(default = "EmptyExamplePolicy::Skip")]
    pub empty_policy: EmptyExamplePolicy,

    /// Encoding threads, 0 lets rayon decide.
    #[config(default = 0)]
    pub workers: usize,
}

#[derive(Config, Debug)]
pub struct TrainSection {
    #[config(default = true)]
    pub flag: bool,

    #[config(default = 20)]
    pub batch_size: usize,
}

#[derive(Config, Debug)]
pub struct TreeSection {
    #[config(default = 64)]
    pub base_size: usize,

    #[config(default = 3)]
    pub branch_num: usize,
}

impl TreeSection {
    /// Resolution of the last generator stage.
    pub fn image_size(&self) -> usize {
        self.base_size << self.branch_num.saturating_sub(1)
    }
}

#[derive(Config, Debug)]
pub struct RunConfig {
    #[config(default = "\"coco\".to_string()")]
    pub dataset_name: String,

    #[config(default = "\"attn2\".to_string()")]
    pub config_name: String,

    #[config(default = "\"data/coco\".to_string()")]
    pub data_dir: String,

    #[config(default = 0)]
    pub gpu_id: i32,

    #[config(default = true)]
    pub cuda: bool,

    #[config(default = 6)]
    pub workers: usize,

    pub seed: Option<u64>,

    #[config(default = false)]
    pub b_validation: bool,

    #[config(default = "TrainSection::new()")]
    pub train: TrainSection,

    #[config(default = "TreeSection::new()")]
    pub tree: TreeSection,

    #[config(default = "ExampleConfig::new()")]
    pub examples: ExampleConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_coco_setup() {
        let config = RunConfig::new();
        assert_eq!(config.dataset_name, "coco");
        assert_eq!(config.data_dir, "data/coco");
        assert!(config.train.flag);
        assert_eq!(config.seed, None);
        assert_eq!(config.examples.token_pattern, r"\w+");
        assert_eq!(config.examples.empty_policy, EmptyExamplePolicy::Skip);
    }

    #[test]
    fn image_size_doubles_per_branch() {
        assert_eq!(TreeSection::new().image_size(), 256);
        assert_eq!(TreeSection::new().with_branch_num(1).image_size(), 64);
        assert_eq!(
            TreeSection::new().with_base_size(32).with_branch_num(2).image_size(),
            64
        );
    }

    #[test]
    fn nested_sections_have_builders() {
        let config = RunConfig::new()
            .with_train(TrainSection::new().with_flag(false))
            .with_b_validation(true);
        assert!(!config.train.flag);
        assert!(config.b_validation);
    }
}
