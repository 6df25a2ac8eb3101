use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use attngan_captions::{
    CaptionPreview, Mode, RunConfig, SplitPlan, Vocabulary, dispatch,
    utils::{prepare_output_dir, resolve_seed},
};
use burn::prelude::*;
use clap::Parser;

#[cfg(feature = "cuda")]
type MyBackend = burn::backend::Cuda<f32, i32>;
#[cfg(not(feature = "cuda"))]
type MyBackend = burn::backend::NdArray<f32>;

#[derive(Parser, Debug)]
#[command(name = "attngan-captions", about = "Run an AttnGAN mode with example captions")]
struct Args {
    /// JSON run configuration
    #[arg(long = "cfg")]
    cfg_file: Option<PathBuf>,

    /// GPU index, -1 disables CUDA
    #[arg(long = "gpu", allow_negative_numbers = true)]
    gpu_id: Option<i32>,

    /// Existing run directory to continue in
    #[arg(long)]
    resume: Option<PathBuf>,

    #[arg(long)]
    data_dir: Option<String>,

    #[arg(long = "manual-seed")]
    manual_seed: Option<u64>,

    /// Vocabulary JSON, defaults to <data_dir>/vocab.json
    #[arg(long)]
    vocab: Option<PathBuf>,

    #[arg(long, default_value = "output")]
    output_root: PathBuf,

    /// Write the encoded example captions to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> Result<RunConfig> {
        let mut config = match &self.cfg_file {
            Some(path) => RunConfig::load(path)
                .map_err(|e| anyhow::anyhow!("cannot load config '{}': {e}", path.display()))?,
            None => RunConfig::new(),
        };
        match self.gpu_id {
            Some(-1) => config.cuda = false,
            Some(id) => config.gpu_id = id,
            None => {}
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if self.manual_seed.is_some() {
            config.seed = self.manual_seed;
        }
        Ok(config)
    }
}

fn device(config: &RunConfig) -> <MyBackend as Backend>::Device {
    #[cfg(feature = "cuda")]
    {
        burn::backend::cuda::CudaDevice::new(config.gpu_id.max(0) as usize)
    }
    #[cfg(not(feature = "cuda"))]
    {
        if config.cuda {
            tracing::warn!("Built without CUDA support, running on the CPU");
        }
        Default::default()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("attngan_captions=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = args.load_config()?;
    let seed = resolve_seed(config.seed);
    config.seed = Some(seed);
    tracing::info!("Using config:\n{}", config);

    MyBackend::seed(seed);
    let device = device(&config);

    let output_dir = prepare_output_dir(&config, &args.output_root, args.resume.as_deref())?;
    if args.resume.is_none() {
        config
            .save(output_dir.join("config.json"))
            .context("Config should be saved successfully")?;
    }
    tracing::info!("Output directory: {}", output_dir.display());

    let plan = SplitPlan::from_config(&config);
    tracing::info!(
        "Images from {} at {}px (shuffle: {}, batch size: {})",
        plan.image_dir.display(),
        plan.image_size,
        plan.shuffle,
        config.train.batch_size,
    );

    let vocab = if Mode::from_config(&config) == Mode::Examples {
        let path = args
            .vocab
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.data_dir).join("vocab.json"));
        Vocabulary::load(path)?
    } else {
        Vocabulary::default()
    };

    let mut algo = CaptionPreview::<MyBackend>::new(device);
    if let Some(path) = &args.dump {
        algo = algo.with_dump(path);
    }

    let start = Instant::now();
    let mode = dispatch(&mut algo, &config, &vocab)?;
    println!("Total time for {:?}: {:.2?}", mode, start.elapsed());
    Ok(())
}
