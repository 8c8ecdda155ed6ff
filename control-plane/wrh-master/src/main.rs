use envconfig::Envconfig;
use wrh_master::MasterConfig;
use wrh_observability::{TracingConfig, setup_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let conf = MasterConfig::init_from_env()?;
    setup_tracing(TracingConfig::from_env(
        "wrh-master",
        conf.log_format.as_deref(),
    ))?;
    wrh_master::start_server(conf).await
}
