use clap::Parser;

use investdesk::config::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    investdesk::telemetry::init_tracing(cli.log_json);

    if let Err(e) = investdesk::commands::run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
