use std::path::PathBuf;
use std::process;

use taxi_fare::config::AppConfig;
use taxi_fare::errors::Result;
use taxi_fare::input::{self, InputFormat};
use taxi_fare::model::TrainedModel;
use taxi_fare::pipeline::filter_rows;
use taxi_fare::record::{sample_trip, SAMPLE_ACTUAL_FARE};
use taxi_fare::report;
use taxi_fare::trainer::{evaluate, train, train_test_split};
use tracing::{error, info};

const CONFIG_FILE: &str = "taxi-fare.json";

fn rule() {
    println!("{}", "*".repeat(60));
}

fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

fn run() -> Result<()> {
    let base = exe_dir()?;
    let cfg = AppConfig::load_or_default(base.join(CONFIG_FILE))?.resolve(&base);
    info!(data = %cfg.data_path.display(), model = %cfg.model_path.display(), "Starting");

    // Clean and load
    let fmt = InputFormat::csv_format();
    input::clean_csv(&cfg.data_path, &cfg.cleaned_path, &fmt)?;
    let records = input::load_records(&cfg.cleaned_path, &fmt)?;

    // Dataset statistics
    rule();
    print!("{}", report::missing_values(&records));
    rule();
    print!("{}", report::distinct_values(&records));
    rule();
    print!("{}", report::frequencies(&records, &cfg.frequency_field)?);
    rule();

    // Train and evaluate
    let rows = filter_rows(records, &cfg);
    let (train_set, test_set) = train_test_split(rows, cfg.test_fraction, cfg.seed);
    println!("Training on {} trips, testing on {}", train_set.len(), test_set.len());
    let model = train(&cfg.boost, &train_set)?;
    let metrics = evaluate(&model, &test_set)?;
    rule();
    println!("{}", metrics);
    rule();

    // Persist, reload and try one trip
    model.save(&cfg.model_path)?;
    println!("Model saved to {}", cfg.model_path.display());
    let model = TrainedModel::load(&cfg.model_path)?;
    let fare = model.predict_one(&sample_trip());
    println!("Predicted fare: {:.4}, actual fare: {}", fare, SAMPLE_ACTUAL_FARE);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxi_fare=info".into()),
        )
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
