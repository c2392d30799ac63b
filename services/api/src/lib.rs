mod cli;
mod estimate;
mod infra;
mod routes;
mod server;

use allotment_odds::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
