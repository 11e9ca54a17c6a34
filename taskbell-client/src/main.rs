use clap::Parser;
use taskbell_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), taskbell_client::AppError> {
    run(Cli::parse()).await
}
