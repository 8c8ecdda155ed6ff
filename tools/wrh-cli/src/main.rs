use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use wrh_cli::WrhCli;

#[tokio::main]
async fn main() {
    init_log();
    let cli = WrhCli::parse();
    if let Err(e) = wrh_cli::run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_log() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("WRH_LOG")
                .from_env_lossy(),
        )
        .init();
}
