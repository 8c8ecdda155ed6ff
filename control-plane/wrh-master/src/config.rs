use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct MasterConfig {
    #[envconfig(from = "WRH_HTTP_PORT", default = "7070")]
    pub http_port: u16,
    /// Directory holding one JSON snapshot per group. In-memory only when unset.
    #[envconfig(from = "WRH_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<String>,
    /// Comma separated `identity:secret` pairs accepted on the query endpoint.
    #[envconfig(from = "WRH_REPLICA_CREDENTIALS")]
    pub replica_credentials: Option<String>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<String>,
}
