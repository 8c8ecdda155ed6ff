use envconfig::Envconfig;
use wrh_models::ControllerSettings;

#[derive(Envconfig, Clone, Debug)]
pub struct ReplicaConfig {
    /// Master address. When unset the replica starts unconfigured and reuses
    /// settings persisted by an earlier run, if any.
    #[envconfig(from = "WRH_MASTER_ADDR")]
    pub master_addr: Option<String>,
    #[envconfig(from = "WRH_MASTER_PORT", default = "7070")]
    pub master_port: u16,
    #[envconfig(from = "WRH_IDENTITY", default = "replica")]
    pub identity: String,
    #[envconfig(from = "WRH_CREDENTIAL", default = "")]
    pub credential: String,
    /// Comma separated shard groups to keep in sync.
    #[envconfig(from = "WRH_GROUPS", default = "")]
    pub groups: String,
    #[envconfig(from = "WRH_REFRESH_SECONDS", default = "10")]
    pub refresh_secs: u64,
    #[envconfig(from = "WRH_REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout_ms: u64,
    #[envconfig(from = "WRH_STATE_PATH")]
    pub state_path: Option<String>,
    #[envconfig(from = "WRH_STATUS_PORT", default = "7071")]
    pub status_port: u16,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl ReplicaConfig {
    pub fn group_list(&self) -> Vec<String> {
        self.groups
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn controller_settings(&self) -> Option<ControllerSettings> {
        self.master_addr.as_ref().map(|addr| ControllerSettings {
            master_address: addr.clone(),
            master_port: self.master_port,
            identity: self.identity.clone(),
            credential: self.credential.clone(),
            refresh_interval_secs: self.refresh_secs,
        })
    }
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            master_addr: None,
            master_port: 7070,
            identity: "replica".into(),
            credential: String::new(),
            groups: String::new(),
            refresh_secs: ControllerSettings::DEFAULT_REFRESH_SECS,
            request_timeout_ms: 5000,
            state_path: None,
            status_port: 7071,
            log_format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_list() {
        let config = ReplicaConfig {
            groups: " g1, ,g2,".into(),
            ..Default::default()
        };
        assert_eq!(config.group_list(), vec!["g1", "g2"]);
    }

    #[test]
    fn settings_only_with_master_address() {
        let mut config = ReplicaConfig::default();
        assert!(config.controller_settings().is_none());
        config.master_addr = Some("master.local".into());
        let settings = config.controller_settings().unwrap();
        assert_eq!(settings.master_port, 7070);
        assert_eq!(
            settings.refresh_interval_secs,
            ControllerSettings::DEFAULT_REFRESH_SECS
        );
    }
}
