use anyhow::Context;
use exam_predictor::{config::Config, training};
use tracing::{debug, info};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("starting exam score training pipeline");

    let config_path = "config.toml";
    debug!("loading config from {}", config_path);
    let config = Config::load(config_path).context("failed to load training configuration")?;
    debug!(?config, "config loaded");

    let summary = training::run(&config).context("training pipeline failed")?;

    for evaluation in &summary.evaluations {
        info!(
            family = %evaluation.family,
            vanilla = evaluation.vanilla_score,
            tuned = evaluation.tuned_score,
            tuned_better = evaluation.tuned_better,
            "evaluation"
        );
    }
    info!(
        best = %summary.best_name,
        score = summary.best_score,
        "training complete"
    );

    Ok(())
}
