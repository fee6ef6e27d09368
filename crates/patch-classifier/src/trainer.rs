//! Fitting and persisting the patch classifier.

use std::fs;
use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::config::Config;
use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::config::TrainingConfig;
use crate::error::{ClassifierError, Result};
use crate::model::{PatchCnn, PatchCnnConfig};
use crate::paths::ArtifactKey;
use crate::NUM_CLASSES;

/// Backend used for inference.
pub type InferenceBackend = NdArray<f32>;
/// Backend used for training.
pub type TrainingBackend = Autodiff<InferenceBackend>;

const EPSILON: f32 = 1e-7;

/// Inputs and one-hot targets laid out for the network.
pub struct Examples {
    /// `[example, channel, y, x]`, NaN replaced by zero.
    inputs: Vec<f32>,
    targets: Vec<f32>,
    labels: Vec<u8>,
    channels: usize,
    size: usize,
}

impl Examples {
    /// From a `[example, y, x, variable]` tensor and one label per example.
    pub fn new(data: &Array4<f32>, labels: &[u8]) -> Result<Self> {
        let (n, height, width, channels) = data.dim();
        if n != labels.len() {
            return Err(ClassifierError::shape(format!(
                "{} examples but {} labels",
                n,
                labels.len()
            )));
        }
        if height != width {
            return Err(ClassifierError::shape(format!(
                "patches must be square, got {}x{}",
                height, width
            )));
        }

        let inputs = to_network_layout(data);
        let mut targets = vec![0.0f32; n * NUM_CLASSES];
        for (i, &label) in labels.iter().enumerate() {
            let label = usize::from(label);
            if label >= NUM_CLASSES {
                return Err(ClassifierError::shape(format!("label {} out of range", label)));
            }
            targets[i * NUM_CLASSES + label] = 1.0;
        }

        Ok(Self {
            inputs,
            targets,
            labels: labels.to_vec(),
            channels,
            size: height,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn stride(&self) -> usize {
        self.channels * self.size * self.size
    }

    /// Input and target tensors for the given example indices.
    fn batch<B: Backend>(&self, indices: &[usize], device: &B::Device) -> (Tensor<B, 4>, Tensor<B, 2>) {
        let stride = self.stride();
        let mut inputs = Vec::with_capacity(indices.len() * stride);
        let mut targets = Vec::with_capacity(indices.len() * NUM_CLASSES);
        for &i in indices {
            inputs.extend_from_slice(&self.inputs[i * stride..(i + 1) * stride]);
            targets.extend_from_slice(&self.targets[i * NUM_CLASSES..(i + 1) * NUM_CLASSES]);
        }

        let inputs = Tensor::from_data(
            TensorData::new(inputs, [indices.len(), self.channels, self.size, self.size]),
            device,
        );
        let targets = Tensor::from_data(TensorData::new(targets, [indices.len(), NUM_CLASSES]), device);
        (inputs, targets)
    }
}

/// `[n, y, x, c]` to a flat `[n, c, y, x]` buffer with NaN as zero.
pub fn to_network_layout(data: &Array4<f32>) -> Vec<f32> {
    data.view()
        .permuted_axes([0, 3, 1, 2])
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { v })
        .collect()
}

/// Cross-entropy of sigmoid scores normalised to sum to one per row.
pub fn categorical_cross_entropy<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let probabilities = (scores.clone() / scores.sum_dim(1)).clamp(EPSILON, 1.0 - EPSILON);
    (targets * probabilities.log()).sum_dim(1).mean().neg()
}

/// Row-wise argmax of a flat `[n, classes]` buffer.
pub fn argmax_rows(scores: &[f32], classes: usize) -> Vec<usize> {
    scores
        .chunks(classes)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0
        })
        .collect()
}

fn accuracy(scores: &[f32], labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = argmax_rows(scores, NUM_CLASSES)
        .into_iter()
        .zip(labels)
        .filter(|(predicted, &label)| *predicted == usize::from(label))
        .count();
    correct as f64 / labels.len() as f64
}

fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| ClassifierError::model(format!("{:?}", e)))
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Per-epoch metrics of one fit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Fits [`PatchCnn`] models.
pub struct ClassifierTrainer {
    config: TrainingConfig,
    seed: Option<u64>,
}

impl ClassifierTrainer {
    pub fn new(config: TrainingConfig, seed: Option<u64>) -> Self {
        Self { config, seed }
    }

    /// Fit a fresh network. The trailing `validation_split` share of the
    /// examples is held out and never trained on.
    pub fn train(
        &self,
        data: &Array4<f32>,
        labels: &[u8],
    ) -> Result<(PatchCnn<InferenceBackend>, PatchCnnConfig, TrainingHistory)> {
        let examples = Examples::new(data, labels)?;
        let n = examples.len();
        let split = (n as f64 * (1.0 - self.config.validation_split)) as usize;
        if split == 0 {
            return Err(ClassifierError::shape(format!("{} examples leave none to train on", n)));
        }
        let model_config = PatchCnnConfig::new(examples.channels, examples.size);
        if model_config.pooled_size() == 0 {
            return Err(ClassifierError::shape(format!(
                "patch size {} is too small for the network",
                examples.size
            )));
        }

        let mut rng = match self.seed {
            Some(seed) => {
                TrainingBackend::seed(seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let device = Default::default();
        let mut model = model_config.init::<TrainingBackend>(&device);
        let mut optim = AdamConfig::new().init::<TrainingBackend, PatchCnn<TrainingBackend>>();

        let mut order: Vec<usize> = (0..split).collect();
        let validation: Vec<usize> = (split..n).collect();
        let batch_size = self.config.batch_size(n);
        let mut history = TrainingHistory::default();

        info!(
            examples = n,
            validation = validation.len(),
            batch_size = batch_size,
            epochs = self.config.epochs,
            "Training CNN"
        );

        for epoch in 1..=self.config.epochs {
            order.shuffle(&mut rng);
            let mut loss_sum = 0.0;
            let mut scores = Vec::with_capacity(split * NUM_CLASSES);
            let mut seen = Vec::with_capacity(split);

            for batch in order.chunks(batch_size) {
                let (inputs, targets) = examples.batch::<TrainingBackend>(batch, &device);
                let output = model.forward(inputs);
                let loss = categorical_cross_entropy(output.clone(), targets)
                    + model.kernel_norm().mul_scalar(self.config.l2);

                loss_sum += loss.clone().into_scalar().elem::<f64>() * batch.len() as f64;
                scores.extend(to_vec(output.detach())?);
                seen.extend(batch.iter().map(|&i| examples.labels[i]));

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.config.learning_rate, model, grads);
            }

            let (val_loss, val_accuracy) = if validation.is_empty() {
                (None, None)
            } else {
                let (loss, acc) = evaluate(&model.valid(), &examples, &validation, self.config.l2, &device)?;
                (Some(loss), Some(acc))
            };

            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / split as f64,
                accuracy: accuracy(&scores, &seen),
                val_loss,
                val_accuracy,
            };
            info!(
                epoch = epoch,
                loss = metrics.loss,
                accuracy = metrics.accuracy,
                val_loss = ?metrics.val_loss,
                val_accuracy = ?metrics.val_accuracy,
                "Epoch complete"
            );
            history.epochs.push(metrics);
        }

        Ok((model.valid(), model_config, history))
    }
}

fn evaluate<B: Backend>(
    model: &PatchCnn<B>,
    examples: &Examples,
    indices: &[usize],
    l2: f64,
    device: &B::Device,
) -> Result<(f64, f64)> {
    let (inputs, targets) = examples.batch::<B>(indices, device);
    let output = model.forward(inputs);
    let loss = categorical_cross_entropy(output.clone(), targets) + model.kernel_norm().mul_scalar(l2);

    let labels: Vec<u8> = indices.iter().map(|&i| examples.labels[i]).collect();
    Ok((
        loss.into_scalar().elem::<f64>(),
        accuracy(&to_vec(output)?, &labels),
    ))
}

/// Write weights and architecture under the key.
pub fn save_model(
    model: &PatchCnn<InferenceBackend>,
    config: &PatchCnnConfig,
    key: &ArtifactKey,
    model_path: &Path,
) -> Result<()> {
    fs::create_dir_all(model_path)?;
    let weights = key.model_weights(model_path);
    config.save(key.model_config(model_path))?;
    model
        .clone()
        .save_file(&weights, &CompactRecorder::new())
        .map_err(|e| ClassifierError::model(format!("{:?}", e)))?;
    info!(path = %weights.display(), "Wrote CNN model");
    Ok(())
}

/// Load the network saved under the key.
pub fn load_model(key: &ArtifactKey, model_path: &Path) -> Result<PatchCnn<InferenceBackend>> {
    let weights = key.model_weights(model_path);
    let config_path = key.model_config(model_path);
    if !weights.exists() || !config_path.exists() {
        return Err(ClassifierError::configuration(format!(
            "no trained model at {}",
            weights.display()
        )));
    }

    let config = PatchCnnConfig::load(&config_path)
        .map_err(|e| ClassifierError::model(format!("{:?}", e)))?;
    let device = Default::default();
    let model = config
        .init::<InferenceBackend>(&device)
        .load_file(&weights, &CompactRecorder::new(), &device)
        .map_err(|e| ClassifierError::model(format!("{:?}", e)))?;
    info!(path = %weights.display(), "Opened CNN model");
    Ok(model)
}
