//! Neuroscreen: dementia risk screening
//!
//! Command-line front end: train the ensemble, score a record, summarize a
//! dataset or list the form fields.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use neuroscreen::adapters::sanitize::SanitizingMakeWriter;
use neuroscreen::adapters::{CsvTrainingSource, JsonModelStore};
use neuroscreen::application::{render_results, DatasetSummary, PREDICTION_FAILED};
use neuroscreen::domain::{fields::fields_in, FormSection};
use neuroscreen::ports::TrainingSource;
use neuroscreen::{EnsembleConfig, PredictionForm, PredictionService};

#[derive(Debug, Parser)]
#[command(name = "neuroscreen", version, about = "Dementia risk screening")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train the ensemble and print held-out reports
    Train {
        /// Training CSV with the 22 feature columns and Dementia
        #[arg(long)]
        data: PathBuf,
        /// Directory to save the trained bundle to
        #[arg(long)]
        save: Option<PathBuf>,
        /// JSON file with training hyperparameters
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Score one patient record with all three models
    Predict(PredictArgs),
    /// Describe a training CSV
    Summary {
        #[arg(long)]
        data: PathBuf,
    },
    /// List the record fields with their hints
    Fields,
}

#[derive(Debug, Args)]
struct PredictArgs {
    /// Train on this CSV before predicting
    #[arg(long, conflicts_with = "model_dir", required_unless_present = "model_dir")]
    data: Option<PathBuf>,
    /// Load a saved bundle instead of training
    #[arg(long)]
    model_dir: Option<PathBuf>,
    /// JSON file with training hyperparameters (with --data)
    #[arg(long)]
    config: Option<PathBuf>,
    /// 22 comma-separated values in field order
    #[arg(long, conflicts_with = "field", required_unless_present = "field")]
    record: Option<String>,
    /// One field as Name=value; repeat for every field
    #[arg(long)]
    field: Vec<String>,
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Results go to stdout, so logs default to stderr unless redirected.
    let log_mode = std::env::var("NEUROSCREEN_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let (writer, guard) = match log_mode.as_str() {
        "file" => {
            let log_file = std::env::var("NEUROSCREEN_LOG_FILE")
                .unwrap_or_else(|_| "neuroscreen.log".to_string());

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .with_context(|| format!("opening log file {log_file}"))?;
            tracing_appender::non_blocking(file)
        }
        "stdout" => tracing_appender::non_blocking(std::io::stdout()),
        _ => tracing_appender::non_blocking(std::io::stderr()),
    };
    let ansi = use_ansi(
        &log_mode,
        std::io::stdout().is_terminal(),
        std::io::stderr().is_terminal(),
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

/// Colour only when the stream the logs are written to is a terminal.
fn use_ansi(log_mode: &str, stdout_tty: bool, stderr_tty: bool) -> bool {
    match log_mode {
        "file" => false,
        "stdout" => stdout_tty,
        _ => stderr_tty,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EnsembleConfig> {
    let config = match path {
        Some(path) => EnsembleConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?
            .with_env_overrides(),
        None => EnsembleConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn train(data: PathBuf, save: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let mut service = PredictionService::new(load_config(config.as_ref())?);
    let report = service
        .train(&data)
        .with_context(|| format!("training on {}", data.display()))?;

    println!(
        "Trained on {} rows, evaluated on {} (seed {})",
        report.train_rows, report.test_rows, report.seed
    );
    for evaluation in &report.evaluations {
        println!();
        println!("{} Results:", evaluation.model);
        println!("Accuracy: {:.4}", evaluation.accuracy);
        print!("{}", evaluation.report);
    }

    if let Some(dir) = save {
        service.save(&JsonModelStore::new(&dir))?;
        println!();
        println!("Saved model bundle to {}", dir.display());
    }
    Ok(())
}

fn predict(args: PredictArgs) -> Result<()> {
    let service = match (&args.model_dir, &args.data) {
        (Some(dir), _) => {
            PredictionService::load(load_config(args.config.as_ref())?, &JsonModelStore::new(dir))?
                .with_context(|| format!("no model bundle in {}", dir.display()))?
        }
        (None, Some(data)) => {
            let mut service = PredictionService::new(load_config(args.config.as_ref())?);
            service
                .train(data)
                .with_context(|| format!("training on {}", data.display()))?;
            service
        }
        (None, None) => bail!("either --data or --model-dir is required"),
    };

    let line = match args.record {
        Some(line) => line,
        None => {
            let form = PredictionForm::from_assignments(&args.field)?;
            for warning in form.validate() {
                tracing::warn!("{}", warning);
            }
            form.to_record_line()?
        }
    };

    match service.try_predict(&line) {
        Some(prediction) => print!("{}", render_results(&prediction, service.report())),
        None => bail!(PREDICTION_FAILED),
    }
    Ok(())
}

fn summary(data: PathBuf) -> Result<()> {
    let table = CsvTrainingSource::new(&data)
        .load()
        .with_context(|| format!("reading {}", data.display()))?;
    print!("{}", DatasetSummary::from_table(&table));
    Ok(())
}

fn fields() {
    for section in FormSection::ALL {
        println!("{}", section.title());
        for spec in fields_in(section) {
            println!("  {:<28} {}", spec.name, spec.hint);
        }
        println!();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    tracing::debug!("Starting Neuroscreen...");

    match cli.command {
        Command::Train { data, save, config } => train(data, save, config),
        Command::Predict(args) => predict(args),
        Command::Summary { data } => summary(data),
        Command::Fields => {
            fields();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_follows_the_log_stream() {
        assert!(!use_ansi("file", true, true));
        assert!(use_ansi("stdout", true, false));
        assert!(!use_ansi("stdout", false, true));
        assert!(use_ansi("auto", false, true));
        assert!(!use_ansi("auto", true, false));
    }
}
