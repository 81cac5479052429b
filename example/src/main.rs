use aws_config::BehaviorVersion;
use firehose_inventory as inventory;
use std::{env, io};

// This example assumes that AWS credentials and region are available from the environment and
// AWS_ACCOUNT_ID holds the account they belong to. Rows are printed as JSON lines.

#[tokio::main]
async fn main() -> Result<(), inventory::error::Error> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let account_id = env::var("AWS_ACCOUNT_ID").unwrap_or_default();

    let client = inventory::Client::new(&config);
    let writer = inventory::writer::JsonLinesWriter::new(io::stdout());

    let summary = inventory::builder()
        .client(client)
        .account_id(account_id)
        .build()
        .write_all(&writer)
        .await?;

    eprintln!(
        "{} delivery streams, {} rows",
        summary.resources, summary.rows
    );

    Ok(())
}
