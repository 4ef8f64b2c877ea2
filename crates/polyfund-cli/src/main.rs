use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    polyfund_cli::app_init().await?;
    polyfund_cli::run().await
}
