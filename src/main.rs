use sync_repos::infrastructure::askpass;
use sync_repos::presentation::cli::CliApp;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Started by an SCM as its askpass helper: answer and leave.
    if askpass::is_relay_invocation() {
        std::process::exit(askpass::run_responder());
    }

    run()
}

#[tokio::main]
async fn run() -> anyhow::Result<()> {
    let app = CliApp::new();

    // Initialize logging
    let default_level = if app.cli().verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    app.run().await
}
