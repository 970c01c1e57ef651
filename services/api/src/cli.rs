use crate::lookup::{run_proof, run_status, ProofArgs, StatusArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use health_gateway::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Health Gateway Immunization",
    about = "Serve or query the Health Gateway vaccine status and proof workflow",
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
    /// Look up a vaccination status and print the result envelope
    Status(StatusArgs),
    /// Request a proof of vaccination and print the result envelope
    Proof(ProofArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Status(args) => run_status(args).await,
        Command::Proof(args) => run_proof(args).await,
    }
}
