use envconfig::Envconfig;
use wrh_observability::{TracingConfig, setup_tracing};
use wrh_replica::ReplicaConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let conf = ReplicaConfig::init_from_env()?;
    setup_tracing(TracingConfig::from_env(
        "wrh-replica",
        conf.log_format.as_deref(),
    ))?;
    wrh_replica::start_replica(conf).await
}
