//! Subcommand handlers. Pipeline work is CPU bound and runs on the blocking
//! pool, one member at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use grid_archive::{ArchiveConfig, ArchiveWriter, Attributes};
use model_grid::{parse_datetime, ForecastRequest, Frequency, GridReader, VariableSpec};
use ndarray::Axis;
use patch_classifier::{DailyForecast, StormModeler};
use serde_json::json;
use tracing::{info, warn};

use crate::config_loader::load_config;
use crate::ReadGridArgs;

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("Pipeline task panicked")?
}

fn archive_writer() -> Result<ArchiveWriter> {
    let config = ArchiveConfig::from_env();
    config.validate().map_err(|e| anyhow!("Invalid archive configuration: {}", e))?;
    Ok(ArchiveWriter::new(config))
}

pub fn modeler(config_path: &Path) -> Result<Arc<StormModeler>> {
    let config = load_config(config_path)?;
    info!(
        config = %config_path.display(),
        train_start = %config.train.start,
        train_end = %config.train.end,
        variables = ?config.forecast_variables,
        "Loaded configuration"
    );
    Ok(Arc::new(StormModeler::new(config)?))
}

pub async fn sample(modeler: Arc<StormModeler>, members: Vec<String>) -> Result<()> {
    for member in members {
        let modeler = modeler.clone();
        let samples = blocking(move || Ok(modeler.sample(&member)?)).await?;

        let mut counts = [0usize; patch_classifier::NUM_CLASSES];
        for s in &samples {
            counts[usize::from(s.label)] += 1;
        }
        let augmented = samples.iter().filter(|s| s.is_augmented()).count();
        info!(total = samples.len(), per_class = ?counts, augmented = augmented, "Sample ready");
    }
    Ok(())
}

pub async fn train(modeler: Arc<StormModeler>, members: Vec<String>) -> Result<()> {
    for member in members {
        let task_modeler = modeler.clone();
        let task_member = member.clone();
        let history = blocking(move || Ok(task_modeler.train_models(&task_member)?))
            .await
            .with_context(|| format!("Training failed for {}", member))?;

        match history.last() {
            Some(last) => info!(
                member = %member,
                epochs = history.epochs.len(),
                loss = last.loss,
                accuracy = last.accuracy,
                val_loss = ?last.val_loss,
                val_accuracy = ?last.val_accuracy,
                "Training complete"
            ),
            None => warn!(member = %member, "Training ran no epochs"),
        }
    }
    Ok(())
}

fn summarize(member: &str, forecast: &DailyForecast, report: &[usize]) -> Result<()> {
    let channels = forecast.channels(report)?;
    for (i, class) in report.iter().enumerate() {
        let scores = channels.index_axis(Axis(0), i);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = scores.mean().unwrap_or(f32::NAN);
        info!(
            member = member,
            date = %forecast.date,
            class = class,
            max = max,
            mean = mean,
            "Forecast summary"
        );
    }
    Ok(())
}

pub async fn forecast(
    modeler: Arc<StormModeler>,
    members: Vec<String>,
    report: Vec<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let writer = archive_writer()?;

    for member in members {
        let task_modeler = modeler.clone();
        let task_member = member.clone();
        let forecasts = blocking(move || Ok(task_modeler.create_forecasts(&task_member)?))
            .await
            .with_context(|| format!("Forecast failed for {}", member))?;

        if forecasts.is_empty() {
            warn!(member = %member, "No forecast dates had patches");
        }
        for forecast in &forecasts {
            summarize(&member, forecast, &report)?;
            if let Some(dir) = &output {
                forecast.write(&writer, dir, &member)?;
            }
        }
    }
    Ok(())
}

pub async fn read_grid(args: ReadGridArgs) -> Result<()> {
    let variable: VariableSpec = args.variable.parse()?;
    let frequency: Frequency = args.frequency.parse()?;
    let request = ForecastRequest::new(
        args.files,
        parse_datetime(&args.run_date)?,
        parse_datetime(&args.start)?,
        parse_datetime(&args.end)?,
        variable.clone(),
        args.member,
        frequency,
    )?;
    let reader = GridReader::new(request).with_lightning_root(args.lightning_root);

    let Some((field, reader)) = blocking(move || Ok(reader.load_data()?.map(|f| (f, reader)))).await? else {
        warn!(variable = %variable, "No data found");
        return Ok(());
    };

    let missing = field.data.iter().filter(|v| v.is_nan()).count();
    info!(
        variable = %variable,
        units = %field.units,
        shape = ?field.data.shape(),
        missing = missing,
        "Read grid"
    );

    if let Some(path) = args.output {
        let request = reader.request();
        let mut attrs = Attributes::new();
        attrs.insert("variable".to_string(), json!(variable.to_string()));
        attrs.insert("units".to_string(), json!(field.units));
        attrs.insert("member".to_string(), json!(request.member));
        attrs.insert("run_date".to_string(), json!(request.run_date.to_rfc3339()));
        attrs.insert(
            "valid_dates".to_string(),
            json!(request
                .valid_dates()
                .iter()
                .map(|d| d.to_rfc3339())
                .collect::<Vec<_>>()),
        );
        attrs.insert("dimensions".to_string(), json!(["time", "y", "x"]));

        let data: Vec<f32> = field.data.iter().copied().collect();
        archive_writer()?.write_f32(&path, field.data.shape(), &data, attrs)?;
        info!(path = %path.display(), "Wrote grid archive");
    }
    Ok(())
}
