use crate::server;
use clap::{Args, Parser, Subcommand};
use cv_evaluator::config::AppConfig;
use cv_evaluator::error::AppError;
use cv_evaluator::telemetry;
use cv_evaluator::workflows::cv_evaluation::{CandidateId, RunStatus};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "CV Evaluator",
    about = "Score candidate CVs on credentials and national importance",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate one candidate document and print the stored evaluation as JSON
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Identifier of the candidate document to evaluate
    pub(crate) document_id: String,
    /// Override the directory holding candidate documents
    #[arg(long)]
    pub(crate) candidates_dir: Option<PathBuf>,
    /// Override the directory evaluations are written to
    #[arg(long)]
    pub(crate) evaluations_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args).await,
    }
}

async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        document_id,
        candidates_dir,
        evaluations_dir,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(dir) = candidates_dir {
        config.storage.candidates_dir = dir;
    }
    if let Some(dir) = evaluations_dir {
        config.storage.evaluations_dir = dir;
    }
    telemetry::init(&config.telemetry)?;

    let id = CandidateId::parse(&document_id).ok_or_else(|| {
        AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "document id must not be blank",
        ))
    })?;

    let service = crate::infra::evaluation_service(&config)?;
    let evaluation = service.evaluate(&id).await?;
    if evaluation.status == RunStatus::Failed {
        warn!(document_id = %id, "evaluation recorded as failed");
    }

    let rendered = serde_json::to_string_pretty(&evaluation)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}
