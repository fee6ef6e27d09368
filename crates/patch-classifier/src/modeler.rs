//! End-to-end training and forecasting per ensemble member.

use std::fs;

use tracing::{info, warn};

use crate::config::ModelerConfig;
use crate::error::{ClassifierError, Result};
use crate::forecast::{DailyForecast, ForecastScorer};
use crate::loader::PatchLoader;
use crate::paths::ArtifactKey;
use crate::sample::LabeledPatch;
use crate::sampler::PatchSampler;
use crate::standardize::Standardizer;
use crate::trainer::{save_model, ClassifierTrainer, TrainingHistory};

/// Runs the sample, load, standardize and train pipeline.
pub struct StormModeler {
    config: ModelerConfig,
}

impl StormModeler {
    pub fn new(config: ModelerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelerConfig {
        &self.config
    }

    pub fn artifact_key(&self, member: &str) -> ArtifactKey {
        ArtifactKey::new(member, self.config.train, self.config.num_examples)
    }

    fn standardizer(&self, member: &str) -> Standardizer {
        Standardizer::new(
            self.artifact_key(member).scaling_table(&self.config.model_path),
            self.config.forecast_variables.clone(),
        )
    }

    /// The member's training sample, drawn once and then reused.
    pub fn sample(&self, member: &str) -> Result<Vec<LabeledPatch>> {
        PatchSampler::new(&self.config).sample(member)
    }

    /// Sample, load and standardize patches, then fit and save the member's
    /// network.
    pub fn train_models(&self, member: &str) -> Result<TrainingHistory> {
        let samples = self.sample(member)?;
        if samples.is_empty() {
            return Err(ClassifierError::configuration(format!(
                "no training examples sampled for {}",
                member
            )));
        }
        let labels: Vec<u8> = samples.iter().map(|s| s.label).collect();

        let data = PatchLoader::new(&self.config).load_training(member, &samples)?;
        info!(member = member, shape = ?data.shape(), "Loaded training patches");

        let (data, _) = self.standardizer(member).standardize(data)?;

        let trainer = ClassifierTrainer::new(self.config.training.clone(), self.config.seed);
        let (model, model_config, history) = trainer.train(&data, &labels)?;

        let key = self.artifact_key(member);
        save_model(&model, &model_config, &key, &self.config.model_path)?;
        self.write_history(&key, &history)?;
        Ok(history)
    }

    fn write_history(&self, key: &ArtifactKey, history: &TrainingHistory) -> Result<()> {
        let path = key.training_history(&self.config.model_path);
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| ClassifierError::model(format!("history: {}", e)))?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Score every day of the forecast window that has patch archives.
    pub fn create_forecasts(&self, member: &str) -> Result<Vec<DailyForecast>> {
        let window = self
            .config
            .forecast
            .ok_or_else(|| ClassifierError::configuration("no forecast window configured"))?;

        let key = self.artifact_key(member);
        let scorer = ForecastScorer::load(&key, &self.config.model_path)?;
        let scaling = self.standardizer(member).existing()?;
        let loader = PatchLoader::new(&self.config);

        let mut forecasts = Vec::new();
        for day in window.days() {
            let date = day.format(&self.config.run_date_format).to_string();
            info!(member = member, date = %date, "Predicting");

            let Some(data) = loader.load_forecast(member, &date)? else {
                warn!(member = member, date = %date, "No forecast patches, skipping date");
                continue;
            };
            forecasts.push(scorer.score_day(&date, &data, &scaling)?);
        }
        Ok(forecasts)
    }
}
