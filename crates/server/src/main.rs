use clap::Parser;
use tracing::info;

use inquisition_server::cli::{self, Cli, Command};
use inquisition_server::{router, startup};

fn load_config() -> inquisition_core::Config {
    inquisition_core::config::load_dotenv();
    inquisition_core::Config::from_env()
}

async fn serve(config: &inquisition_core::Config) -> anyhow::Result<()> {
    config.log_summary();
    let state = startup::build_app_state(config).await?;
    let app = router::build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = load_config();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::CheckConfig { file } => {
            print!("{}", cli::check_config(&file)?);
            Ok(())
        }
    }
}
