//! Reconstruction criteria.

mod bce;
mod mse;

pub use bce::BinaryCrossEntropyLoss;
pub use mse::MseLoss;

use burn::nn::loss::Reduction;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Which criterion compares a reconstruction with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    #[default]
    BinaryCrossEntropy,
    MeanSquaredError,
}

impl Criterion {
    /// Mean reconstruction error of a batch, shaped `[1]`.
    pub fn forward<B: Backend>(&self, output: Tensor<B, 2>, input: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            Criterion::BinaryCrossEntropy => BinaryCrossEntropyLoss::new().forward(output, input),
            Criterion::MeanSquaredError => MseLoss::new().forward(output, input, Reduction::Mean),
        }
    }
}
