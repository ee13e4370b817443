use crate::mnist::PIXELS;
use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

/// Fully-connected autoencoder squeezing each image through `encoding_dim` neurons.
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    #[config(default = "PIXELS")]
    pub input_size: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    /// Width of the bottleneck between encoder and decoder.
    #[config(default = 3)]
    pub encoding_dim: usize,
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub hidden: Linear<B>,
    pub code: Linear<B>,
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
}

impl AutoencoderConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Autoencoder<B> {
        let linear = |d_input, d_output| {
            LinearConfig::new(d_input, d_output)
                .with_bias(true)
                .init(device)
        };
        Autoencoder {
            encoder: Encoder {
                hidden: linear(self.input_size, self.hidden_size),
                code: linear(self.hidden_size, self.encoding_dim),
            },
            decoder: Decoder {
                hidden: linear(self.encoding_dim, self.hidden_size),
                output: linear(self.hidden_size, self.input_size),
            },
        }
    }
}

impl<B: Backend> Encoder<B> {
    /// # Shapes
    /// - x: [batch_size, input_size]
    /// - output: [batch_size, encoding_dim]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden.forward(x));
        relu(self.code.forward(x))
    }
}

impl<B: Backend> Decoder<B> {
    /// # Shapes
    /// - code: [batch_size, encoding_dim]
    /// - output: [batch_size, input_size], values in `[0, 1]`
    pub fn forward(&self, code: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden.forward(code));
        sigmoid(self.output.forward(x))
    }
}

impl<B: Backend> Autoencoder<B> {
    pub fn encode(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.encoder.forward(x)
    }

    pub fn decode(&self, code: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decoder.forward(code)
    }

    /// Reconstructs the input through the bottleneck.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, input_size] = x.dims();
        let output = self.decode(self.encode(x));
        debug_assert_eq!([batch_size, input_size], output.dims());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    #[test]
    fn reconstruction_keeps_input_shape() {
        let device = Default::default();
        let model = AutoencoderConfig::new().init::<B>(&device);
        let input = Tensor::<B, 2>::random([4, PIXELS], Distribution::Uniform(0., 1.), &device);

        let code = model.encode(input.clone());
        assert_eq!(code.dims(), [4, 3]);
        let code_min: f32 = code.min().into_scalar();
        assert!(code_min >= 0.0);

        let output = model.forward(input);
        assert_eq!(output.dims(), [4, PIXELS]);
        let min: f32 = output.clone().min().into_scalar();
        let max: f32 = output.max().into_scalar();
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    fn respects_configured_sizes() {
        let device = Default::default();
        let model = AutoencoderConfig::new()
            .with_input_size(16)
            .with_hidden_size(8)
            .with_encoding_dim(2)
            .init::<B>(&device);
        assert_eq!(model.encoder.hidden.weight.dims(), [16, 8]);
        assert_eq!(model.encoder.code.weight.dims(), [8, 2]);
        assert_eq!(model.decoder.hidden.weight.dims(), [2, 8]);
        assert_eq!(model.decoder.output.weight.dims(), [8, 16]);

        let input = Tensor::<B, 2>::zeros([5, 16], &device);
        assert_eq!(model.decode(model.encode(input)).dims(), [5, 16]);
    }
}
