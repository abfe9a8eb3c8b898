use clap::Parser;

use outreach::app;
use outreach::cli::Cli;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = app::run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
