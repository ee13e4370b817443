//! Files written next to a training run: configs, checkpoint, optimizer state,
//! loss log and reconstruction plots.

use crate::backend::RecorderTy;
use crate::error::{Error, Result};
use crate::model::{Autoencoder, AutoencoderConfig};
use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::record::{FileRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;
use std::path::{Path, PathBuf};

pub const TRAINING_CONFIG_NAME: &str = "training_config.json";
pub const MODEL_CONFIG_NAME: &str = "model_config.json";
pub const MODEL_NAME: &str = "sim_autoencoder";
pub const OPTIM_NAME: &str = "optim";
pub const LOSS_LOG_NAME: &str = "loss.txt";

#[derive(Debug, Clone)]
pub struct Artifacts {
    dir: PathBuf,
}

impl Artifacts {
    /// Uses `dir`, creating it when missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn training_config_path(&self) -> PathBuf {
        self.dir.join(TRAINING_CONFIG_NAME)
    }

    pub fn model_config_path(&self) -> PathBuf {
        self.dir.join(MODEL_CONFIG_NAME)
    }

    pub fn loss_log_path(&self) -> PathBuf {
        self.dir.join(LOSS_LOG_NAME)
    }

    /// Comparison image of the given (1-based) outer repetition.
    pub fn reconstruction_path(&self, repetition: usize) -> PathBuf {
        self.dir.join(format!("reconstruction_{repetition}.png"))
    }

    /// Checkpoint path including the recorder's extension.
    pub fn model_path<B: Backend>(&self) -> PathBuf {
        with_extension::<B>(self.dir.join(MODEL_NAME))
    }

    pub fn optim_path<B: Backend>(&self) -> PathBuf {
        with_extension::<B>(self.dir.join(OPTIM_NAME))
    }

    pub fn save_config(&self, path: &Path, config: &impl Config) -> Result<()> {
        log::debug!("Saving config into {path:?}");
        config.save(path).map_err(|e| Error::io(path, e))
    }

    /// Loads a config from `path` when the file exists.
    pub fn load_config<C: Config>(&self, path: &Path) -> Result<Option<C>> {
        if !path.exists() {
            return Ok(None);
        }
        log::info!("Loading config from {path:?}");
        C::load(path).map(Some).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        })
    }

    /// Overwrites the checkpoint with the current weights.
    pub fn save_model<B: Backend>(&self, model: &Autoencoder<B>) -> Result<()> {
        let path = self.dir.join(MODEL_NAME);
        log::info!("Saving model to {:?}", self.model_path::<B>());
        model
            .clone()
            .save_file(path, &RecorderTy::new())?; // ext added automatically
        Ok(())
    }

    pub fn load_model<B: Backend>(
        &self,
        model_config: &AutoencoderConfig,
        device: &B::Device,
    ) -> Result<Option<Autoencoder<B>>> {
        if !self.model_path::<B>().exists() {
            return Ok(None);
        }
        log::info!("Loading model from {:?}", self.model_path::<B>());
        let model = model_config
            .init::<B>(device)
            .load_file(self.dir.join(MODEL_NAME), &RecorderTy::new(), device)?;
        Ok(Some(model))
    }

    pub fn save_optim<AutoB, AutoM>(&self, optim: &impl Optimizer<AutoM, AutoB>) -> Result<()>
    where
        AutoB: AutodiffBackend,
        AutoM: AutodiffModule<AutoB>,
    {
        log::debug!("Saving optim to {:?}", self.optim_path::<AutoB>());
        RecorderTy::new().record(optim.to_record(), self.dir.join(OPTIM_NAME))?;
        Ok(())
    }

    /// Restores the optimizer state into `optim` when a saved state exists.
    pub fn load_optim<AutoB, AutoM, Optim>(
        &self,
        optim: Optim,
        device: &AutoB::Device,
    ) -> Result<Optim>
    where
        AutoB: AutodiffBackend,
        AutoM: AutodiffModule<AutoB>,
        Optim: Optimizer<AutoM, AutoB>,
    {
        if !self.optim_path::<AutoB>().exists() {
            return Ok(optim);
        }
        log::info!("Loading optim from {:?}", self.optim_path::<AutoB>());
        let record = RecorderTy::new().load(self.dir.join(OPTIM_NAME), device)?;
        Ok(optim.load_record(record))
    }
}

fn with_extension<B: Backend>(path: PathBuf) -> PathBuf {
    path.with_extension(<RecorderTy as FileRecorder<B>>::file_extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn checkpoint_roundtrip_keeps_weights() {
        let dir = temp_dir::TempDir::new().unwrap();
        let artifacts = Artifacts::new(dir.path().join("run")).unwrap();
        assert_eq!(artifacts.dir(), dir.path().join("run"));
        assert!(artifacts.dir().is_dir());
        let device = Default::default();
        let config = AutoencoderConfig::new()
            .with_input_size(6)
            .with_hidden_size(4)
            .with_encoding_dim(2);

        assert!(artifacts.load_model::<B>(&config, &device).unwrap().is_none());

        let model = config.init::<B>(&device);
        artifacts.save_model(&model).unwrap();
        assert!(artifacts.model_path::<B>().ends_with("sim_autoencoder.mpk"));
        assert!(artifacts.model_path::<B>().exists());

        let loaded = artifacts.load_model::<B>(&config, &device).unwrap().unwrap();
        model
            .encoder
            .hidden
            .weight
            .to_data()
            .assert_eq(&loaded.encoder.hidden.weight.to_data(), true);
        model
            .decoder
            .output
            .weight
            .to_data()
            .assert_eq(&loaded.decoder.output.weight.to_data(), true);
    }

    #[test]
    fn configs_are_optional_until_saved() {
        let dir = temp_dir::TempDir::new().unwrap();
        let artifacts = Artifacts::new(dir.path()).unwrap();
        let path = artifacts.model_config_path();
        assert!(artifacts.load_config::<AutoencoderConfig>(&path).unwrap().is_none());

        let config = AutoencoderConfig::new().with_encoding_dim(8);
        artifacts.save_config(&path, &config).unwrap();
        let loaded: AutoencoderConfig = artifacts.load_config(&path).unwrap().unwrap();
        assert_eq!(loaded.encoding_dim, 8);
        assert_eq!(loaded.hidden_size, 256);
    }

    #[test]
    fn corrupt_config_is_an_error() {
        let dir = temp_dir::TempDir::new().unwrap();
        let artifacts = Artifacts::new(dir.path()).unwrap();
        let path = artifacts.training_config_path();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            artifacts.load_config::<AutoencoderConfig>(&path),
            Err(Error::Config { .. })
        ));
    }
}
