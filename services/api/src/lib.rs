mod cli;
mod commands;
mod infra;
mod reports;
mod routes;
mod server;

use policy_desk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
