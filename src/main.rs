mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, seq::IteratorRandom, SeedableRng};
use tracing::{info, warn};

use ferrite_fraud::activation::ActivationFunction;
use ferrite_fraud::anomaly::aggregate::group_indices;
use ferrite_fraud::anomaly::{aggregate, FraudModel, MerchantDayScorer};
use ferrite_fraud::data::dates::{add_dates, parse_day};
use ferrite_fraud::data::raw::{read_raw_transactions, RawColumns, RawTransaction};
use ferrite_fraud::forest::{IsolationForest, IsolationForestParams, RandomForest, RandomForestParams};
use ferrite_fraud::optim::OptimizerKind;
use ferrite_fraud::plot::{ConfusionPlotter, MultiPlotter, PngPlotter, TextPlotter};
use ferrite_fraud::train::{
    Device, FeedForward, FitPredictLifecycle, GradientLifecycle, Hyperparams, Lifecycle,
    LogisticRegression, ModelFamily, TrainingConfig,
};

use cli::{ActivationChoice, Cli, Commands, FamilyChoice, ForestKind, OptimizerChoice};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "ferrite_fraud=debug" } else { "ferrite_fraud=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse()?),
        )
        .init();

    match cli.command {
        Commands::TrainForest { train_file, test_file, threshold, model, trees, output_dir, seed, plot } => {
            let config = TrainingConfig::new(train_file, test_file)
                .with_threshold(threshold)
                .with_output_dir(output_dir)
                .with_seed(seed);
            let mut lifecycle = FitPredictLifecycle::new(config).context("Failed to load datasets")?;
            match model {
                ForestKind::RandomForest => lifecycle.set_model(RandomForest::new(RandomForestParams {
                    n_estimators: trees,
                    seed: seed.or(Some(42)),
                    ..Default::default()
                })),
                ForestKind::IsolationForest => lifecycle.set_model(IsolationForest::new(IsolationForestParams {
                    n_estimators: trees,
                    seed: seed.or(Some(42)),
                    ..Default::default()
                })),
            }

            let mut plotter = plotter(plot.as_deref());
            lifecycle.run_training_loop(&mut plotter).context("Training failed")?;
            let path = lifecycle.persist().context("Failed to save checkpoint")?;
            println!("Model saved to {}", path.display());
        }

        Commands::TrainNn {
            train_file,
            test_file,
            threshold,
            family,
            batch_size,
            epochs,
            hidden,
            learning_rate,
            optimizer,
            activation,
            threads,
            seed,
            no_resample,
            hyperparams,
            output_dir,
            plot,
        } => {
            let mut hp = match hyperparams {
                Some(path) => Hyperparams::load_json(&path)
                    .with_context(|| format!("Failed to read hyperparameters from {}", path.display()))?,
                None => Hyperparams::default(),
            };
            if let Some(epochs) = epochs {
                hp.epochs = epochs;
            }
            if let Some(hidden) = hidden {
                hp.hidden = hidden;
            }
            if let Some(activation) = activation {
                hp.activation = match activation {
                    ActivationChoice::Relu => ActivationFunction::ReLU,
                    ActivationChoice::LeakyRelu => ActivationFunction::LeakyReLU { alpha: 0.01 },
                    ActivationChoice::Tanh => ActivationFunction::Tanh,
                    ActivationChoice::Sigmoid => ActivationFunction::Sigmoid,
                };
            }
            let lr = learning_rate.unwrap_or_else(|| hp.optimizer.learning_rate());
            hp.optimizer = match optimizer {
                Some(OptimizerChoice::Sgd) => OptimizerKind::Sgd { learning_rate: lr },
                Some(OptimizerChoice::Adam) => OptimizerKind::Adam { learning_rate: lr },
                None => match hp.optimizer {
                    OptimizerKind::Sgd { .. } => OptimizerKind::Sgd { learning_rate: lr },
                    OptimizerKind::Adam { .. } => OptimizerKind::Adam { learning_rate: lr },
                },
            };

            let config = TrainingConfig::new(train_file, test_file)
                .with_threshold(threshold)
                .with_batch_size(batch_size)
                .with_output_dir(output_dir)
                .with_resample_each_epoch(!no_resample)
                .with_seed(seed)
                .with_device(threads.map_or(Device::Cpu, Device::Threads));

            let mut plotter = plotter(plot.as_deref());
            match family {
                FamilyChoice::Logistic => train_gradient(config, LogisticRegression::new(hp), &mut plotter)?,
                FamilyChoice::FeedForward => train_gradient(config, FeedForward::new(hp), &mut plotter)?,
            }
        }

        Commands::TrainAnomaly { raw_file, fraud_model, contamination, trees, output_dir, seed } => {
            let fraud_model = load_fraud_model(fraud_model.as_deref())?;
            let rows = read_rows(&raw_file, fraud_model.as_ref())?;

            let params = IsolationForestParams {
                n_estimators: trees,
                contamination,
                seed: seed.or(Some(42)),
                ..Default::default()
            };
            let mut scorer = MerchantDayScorer::default();
            scorer.fit(&rows, fraud_model, params).context("Failed to fit anomaly model")?;
            let path = scorer.persist(&output_dir).context("Failed to save anomaly model")?;
            println!("Anomaly model saved to {}", path.display());
        }

        Commands::Score { raw_file, anomaly_model, fraud_model, entity, day } => {
            // Scoring problems are reported, not fatal.
            if let Err(e) = score(&raw_file, &anomaly_model, fraud_model.as_deref(), entity, day) {
                println!("Error while scoring: {e:#}");
            }
        }

        Commands::AddDates { input, output, start, end, column, seed } => {
            let start = parse_day(&start)?;
            let end = parse_day(&end)?;
            let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let rows = add_dates(&input, &output, &column, start, end, &mut rng)
                .with_context(|| format!("Failed to add dates to {}", input.display()))?;
            println!("Wrote {rows} rows to {}", output.display());
        }
    }

    Ok(())
}

fn plotter(png: Option<&Path>) -> MultiPlotter {
    let plotter = MultiPlotter::new().with(TextPlotter::stdout());
    match png {
        Some(path) => plotter.with(PngPlotter::new(path)),
        None => plotter,
    }
}

fn train_gradient<F: ModelFamily>(config: TrainingConfig, family: F, plotter: &mut dyn ConfusionPlotter) -> Result<()> {
    let mut lifecycle = GradientLifecycle::new(config, family).context("Failed to set up training")?;
    let stats = lifecycle.run_epochs(plotter).context("Training failed")?;
    if let Some(last) = stats.last() {
        println!("Final checkpoint: {}", last.checkpoint.display());
    }
    Ok(())
}

fn load_fraud_model(path: Option<&Path>) -> Result<Option<FraudModel>> {
    path.map(|p| {
        FraudModel::load(p).with_context(|| format!("Failed to load fraud model {}", p.display()))
    })
    .transpose()
}

fn read_rows(raw_file: &Path, fraud_model: Option<&FraudModel>) -> Result<Vec<RawTransaction>> {
    let feature_columns = fraud_model
        .map(|m| m.feature_columns().features.clone())
        .unwrap_or_default();
    read_raw_transactions(raw_file, &RawColumns::default(), &feature_columns)
        .with_context(|| format!("Failed to read {}", raw_file.display()))
}

fn score(
    raw_file: &Path,
    anomaly_model: &Path,
    fraud_model: Option<&Path>,
    entity: Option<String>,
    day: Option<String>,
) -> Result<()> {
    let fraud_model = load_fraud_model(fraud_model)?;
    let rows = read_rows(raw_file, fraud_model.as_ref())?;
    let scorer = MerchantDayScorer::load(anomaly_model, fraud_model)
        .with_context(|| format!("Failed to load anomaly model {}", anomaly_model.display()))?;

    let (entity, day) = match (entity, day) {
        (Some(entity), Some(day)) => (entity, day),
        _ => {
            let picked = group_indices(&rows)
                .into_keys()
                .choose(&mut rand::thread_rng())
                .context("No transactions to sample from")?;
            info!(entity = %picked.0, day = %picked.1, "picked a random pair");
            picked
        }
    };
    println!("Testing merchant {entity} on date {day}");

    let summary = aggregate(&rows, &entity, &day)?;
    let score = scorer.predict_for_entity_day(&rows, &entity, &day)?;
    let flagged = scorer.is_anomalous(score)?;
    if flagged {
        warn!(%entity, %day, score, "anomalous merchant-day");
    }
    println!(
        "   {} transactions, total {:.2}, max {:.2}",
        summary.count, summary.sum, summary.max
    );
    println!("   Anomaly score = {score:.4}{}", if flagged { " (anomalous)" } else { "" });
    Ok(())
}
