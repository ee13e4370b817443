//! Fully-connected MNIST autoencoder trained with [burn].
//!
//! Images are squeezed through a bottleneck of `encoding_dim` neurons and
//! reconstructed by the decoder. Training logs the average loss of every epoch
//! to a `epoch;loss` file, plots reconstructions and checkpoints the weights.

pub mod artifacts;
pub mod backend;
pub mod cli;
pub mod error;
pub mod loss;
pub mod loss_log;
pub mod mnist;
pub mod model;
pub mod plot;
pub mod training;

pub use error::{Error, Result};
pub use model::{Autoencoder, AutoencoderConfig};
pub use training::{TrainingConfig, TrainingSummary, train};
