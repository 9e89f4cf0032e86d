use anyhow::Result;
use fitpush::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
