mod cli;
mod infra;
mod lookup;
mod routes;
mod server;

use health_gateway::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
