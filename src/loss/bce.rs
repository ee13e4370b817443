use burn::prelude::*;

/// Binary cross-entropy between predicted probabilities and targets in `[0, 1]`.
#[derive(Module, Clone, Debug, Default)]
pub struct BinaryCrossEntropyLoss;

impl BinaryCrossEntropyLoss {
    pub fn new() -> Self {
        Self
    }

    /// Compute the criterion on the input tensor, averaged over every element.
    ///
    /// # Shapes
    ///
    /// - probabilities: `[batch_size, num_targets]`
    /// - targets: `[batch_size, num_targets]`
    pub fn forward<const D: usize, B: Backend>(
        &self,
        probabilities: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        self.forward_no_reduction(probabilities, targets).mean()
    }

    /// `-(target * log(p) + (1 - target) * log(1 - p))` per element.
    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        probabilities: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, D> {
        // https://github.com/tracel-ai/burn/issues/2739: clamp at -100.0 to avoid undefined values
        (targets.clone() - 1) * probabilities.clone().neg().log1p().clamp_min(-100.0)
            - targets * probabilities.log().clamp_min(-100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn perfect_binary_reconstruction_is_near_zero() {
        let device = Default::default();
        let targets = Tensor::<B, 2>::from_floats([[0.0, 1.0, 1.0, 0.0]], &device);
        let loss: f32 = BinaryCrossEntropyLoss::new()
            .forward(targets.clone(), targets)
            .into_scalar();
        assert!(loss >= 0.0);
        assert!(loss < 1e-6, "{loss}");
    }

    #[test]
    fn matches_closed_form() {
        let device = Default::default();
        let probabilities = Tensor::<B, 2>::from_floats([[0.8, 0.25]], &device);
        let targets = Tensor::<B, 2>::from_floats([[1.0, 0.5]], &device);
        let loss: f32 = BinaryCrossEntropyLoss::new()
            .forward(probabilities, targets)
            .into_scalar();
        let expected = (-(0.8f32.ln()) - (0.5 * 0.25f32.ln() + 0.5 * 0.75f32.ln())) / 2.0;
        assert!((loss - expected).abs() < 1e-5, "{loss} != {expected}");
    }

    #[test]
    fn saturated_predictions_stay_finite() {
        let device = Default::default();
        let probabilities = Tensor::<B, 2>::from_floats([[0.0, 1.0]], &device);
        let targets = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);
        let loss: f32 = BinaryCrossEntropyLoss::new()
            .forward(probabilities, targets)
            .into_scalar();
        assert!((loss - 100.0).abs() < 1e-3, "{loss}");
    }
}
