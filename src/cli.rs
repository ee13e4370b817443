use crate::artifacts::Artifacts;
use crate::error::{Error, Result};
use crate::model::AutoencoderConfig;
use crate::training::{Start, TrainingConfig};
use burn::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
Burn Autoencoder

Trains a fully-connected autoencoder on MNIST, logging the loss per epoch,
plotting reconstructions and checkpointing the weights.

USAGE:
    burn-autoencoder [OPTIONS]

BEHAVIOR OVERVIEW
- Training runs for `num_loops` repetitions of `num_epochs` epochs. After each
  repetition a reconstruction plot is written and the checkpoint is overwritten.
- If --training-config or --model-config is given, that config is used and saved
  to the artifacts directory. Otherwise the copy in the artifacts directory is used,
  or the defaults when there is none.
- With --resume, the checkpoint and optimizer state in the artifacts directory are
  loaded and the loss log is continued instead of truncated.

FLAGS:
    -h, --help                  Show this help message and exit
    -r, --resume                Continue from the checkpoint in the artifacts directory

OPTIONS:
    -a, --artifacts-path <PATH> Directory for configs, checkpoint, loss log and plots
                                (default: current directory)
    -d, --data-dir <PATH>       Download cache for MNIST
                                (default: ~/.cache/burn-dataset)
    -c, --training-config <PATH>
                                Load the training configuration from this file
    -m, --model-config <PATH>   Load the model configuration from this file

Logging verbosity follows RUST_LOG (default: info).
";

#[derive(Debug, Clone, PartialEq)]
pub struct AppArgs {
    pub help: bool,
    pub resume: bool,
    pub training_config: Option<PathBuf>,
    pub model_config: Option<PathBuf>,
    pub artifacts_path: PathBuf,
    pub data_dir: Option<PathBuf>,
}

impl AppArgs {
    pub fn parse() -> Result<Self> {
        Self::parse_from(std::env::args_os().skip(1).collect())
    }

    pub fn parse_from(args: Vec<OsString>) -> Result<Self> {
        let mut pargs = pico_args::Arguments::from_vec(args);

        let args = AppArgs {
            help: pargs.contains(["-h", "--help"]),
            training_config: pargs
                .opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
            model_config: pargs.opt_value_from_os_str(["-m", "--model-config"], parse_path)?,
            artifacts_path: pargs
                .opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?
                .unwrap_or_else(|| PathBuf::from(".")),
            data_dir: pargs.opt_value_from_os_str(["-d", "--data-dir"], parse_path)?,
            // must parse flags after values
            resume: pargs.contains(["-r", "--resume"]),
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(Error::UnusedArgs(remaining));
        }

        Ok(args)
    }

    pub fn start(&self) -> Start {
        if self.resume { Start::Resume } else { Start::New }
    }

    pub fn training_config(&self, artifacts: &Artifacts) -> Result<TrainingConfig> {
        let stored = artifacts.training_config_path();
        let source = self.training_config.as_deref().unwrap_or(&stored);
        let config = resolve_config(self.training_config.as_deref(), artifacts, &stored)?
            .unwrap_or_else(TrainingConfig::new);
        check_training_config(&config).map_err(|reason| Error::Config {
            path: source.to_path_buf(),
            reason: reason.into(),
        })?;
        Ok(config)
    }

    pub fn model_config(&self, artifacts: &Artifacts) -> Result<AutoencoderConfig> {
        resolve_config(
            self.model_config.as_deref(),
            artifacts,
            &artifacts.model_config_path(),
        )
        .map(|config| config.unwrap_or_else(AutoencoderConfig::new))
    }
}

/// Explicit file first, then the copy stored with the artifacts.
fn resolve_config<C: Config>(
    explicit: Option<&Path>,
    artifacts: &Artifacts,
    stored: &Path,
) -> Result<Option<C>> {
    match explicit {
        Some(path) => match artifacts.load_config(path)? {
            Some(config) => Ok(Some(config)),
            None => Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            )),
        },
        None => artifacts.load_config(stored),
    }
}

/// Values the data loader and the plot cannot work with.
fn check_training_config(config: &TrainingConfig) -> std::result::Result<(), &'static str> {
    if config.batch_size == 0 {
        return Err("batch_size must be positive");
    }
    if config.num_samples == 0 {
        return Err("num_samples must be positive");
    }
    if config.plot_scale == 0 {
        return Err("plot_scale must be positive");
    }
    Ok(())
}

fn parse_path(s: &std::ffi::OsStr) -> std::result::Result<PathBuf, &'static str> {
    Ok(s.into())
}
