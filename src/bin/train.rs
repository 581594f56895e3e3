//! Offline training job: reads the dataset, fits the forest and writes the artifact.

use anyhow::Context;
use propval::common::config::AppCfg;
use propval::common::{ids, log};
use propval::data::{DatasetSource, HttpDatasetSource};
use propval::training::{self, FsModelRepo, Hyperparameters};

fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load().context("reading configuration")?;
    log::init(cfg.log_format);
    let hp = Hyperparameters::from_env().context("reading hyperparameters")?;

    let source = HttpDatasetSource::from_cfg(&cfg);
    let repo = FsModelRepo::from_cfg(&cfg);
    tracing::info!(
        dataset = %source.describe(),
        artifact = %cfg.model_path().display(),
        "starting training run"
    );

    let report = training::service::run(&source, &hp, &repo).context("training failed")?;

    println!(
        "Model trained. MSE: {:.2}, R2: {:.2}",
        report.metrics.mse, report.metrics.r2
    );
    println!(
        "Model saved to {} ({} train / {} test rows, dataset {}, {} ms)",
        report.artifact_path.display(),
        report.n_train,
        report.n_test,
        ids::to_hex(report.dataset_fingerprint),
        report.duration_ms
    );
    Ok(())
}
