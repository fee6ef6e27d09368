//! The patch classifier network.
//!
//! Three convolution blocks (32, 64, 64 filters; 3x3 kernels with same
//! padding, ReLU, 2x2 max-pool) feed a 64-unit dense layer and a sigmoid
//! output per class.

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

const FILTERS: [usize; 3] = [32, 64, 64];
const HIDDEN_UNITS: usize = 64;

#[derive(Config, Debug)]
pub struct PatchCnnConfig {
    /// Input channels, one per variable.
    pub channels: usize,
    /// Edge length of the square input patches.
    pub patch_size: usize,
    #[config(default = 4)]
    pub num_classes: usize,
}

impl PatchCnnConfig {
    /// Spatial edge length after the three pooling stages.
    pub fn pooled_size(&self) -> usize {
        self.patch_size / 8
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PatchCnn<B> {
        let conv = |input: usize, output: usize| {
            Conv2dConfig::new([input, output], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };
        let features = FILTERS[2] * self.pooled_size() * self.pooled_size();

        PatchCnn {
            conv1: conv(self.channels, FILTERS[0]),
            conv2: conv(FILTERS[0], FILTERS[1]),
            conv3: conv(FILTERS[1], FILTERS[2]),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dense: LinearConfig::new(features, HIDDEN_UNITS).init(device),
            output: LinearConfig::new(HIDDEN_UNITS, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct PatchCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    dense: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> PatchCnn<B> {
    /// `[batch, channel, y, x]` to per-class sigmoid scores `[batch, class]`.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(input)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.pool.forward(relu(self.conv3.forward(x)));

        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = relu(self.dense.forward(x));
        sigmoid(self.output.forward(x))
    }

    /// Sum of squared convolution kernel weights.
    pub fn kernel_norm(&self) -> Tensor<B, 1> {
        self.conv1.weight.val().powf_scalar(2.0).sum()
            + self.conv2.weight.val().powf_scalar(2.0).sum()
            + self.conv3.weight.val().powf_scalar(2.0).sum()
    }
}
