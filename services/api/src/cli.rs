use crate::commands::{run_inspect, run_predict, run_train, InspectArgs, PredictArgs, TrainArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_approval::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "loan-approval",
    about = "Train, inspect, and serve the loan approval decision model",
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
    /// Train a model bundle from a historical applications CSV
    Train(TrainArgs),
    /// Score one applicant JSON document against the current bundle
    Predict(PredictArgs),
    /// Print a summary of the current bundle
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured model bundle path
    #[arg(long)]
    pub(crate) artifact: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Train(args) => run_train(args),
        Command::Predict(args) => run_predict(args),
        Command::Inspect(args) => run_inspect(args),
    }
}
