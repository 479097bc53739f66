//! crxpack - package browser extensions as signed CRX3 files

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crxpack_cli::cmd;
use crxpack_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Pack(args) => cmd::pack::pack(&args, json).await,
        Commands::Verify { crx } => cmd::verify::verify(&crx, json),
        Commands::Id { key } => cmd::id::id(&key, json),
        Commands::Keygen { out, bits, force } => cmd::keygen::keygen(&out, bits, force, json),
    }
}
