/// Blocklab CLI
///
/// Runs serialized block programs against the simulated rig and inspects the
/// persisted position, without requiring the HTTP transport.
use tracing_subscriber::EnvFilter;

use blocklab::cli;

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
