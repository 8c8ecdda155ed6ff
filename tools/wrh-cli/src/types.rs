use wrh_models::ShardHost;

/// Administer shard group versions on a wrh master
#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct WrhCli {
    #[command(subcommand)]
    pub command: WrhCommands,
    /// Base URL of the master
    #[arg(
        long,
        global = true,
        env = "WRH_MASTER_URL",
        default_value = "http://localhost:7070"
    )]
    pub master_url: String,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum WrhCommands {
    /// Add a shard host to the group's draft
    #[clap(aliases = &["add"])]
    AddHost {
        group: String,
        #[clap(flatten)]
        host: HostArgs,
    },
    /// Remove a shard host from the group's draft
    #[clap(aliases = &["rm"])]
    RemoveHost {
        group: String,
        #[clap(flatten)]
        host: HostArgs,
    },
    /// Publish the pending version
    Publish { group: String },
    /// Discard the pending draft, or release a published one
    Discard { group: String },
    /// Show the current published version
    Current {
        group: String,
        #[arg(long, env = "WRH_IDENTITY", default_value = "wrh-cli")]
        identity: String,
        #[arg(long, env = "WRH_CREDENTIAL", default_value = "")]
        credential: String,
    },
    /// Show the pending version, if any
    Pending { group: String },
    /// List every version of the group
    #[clap(aliases = &["ls"])]
    Versions { group: String },
}

#[derive(clap::Args, Clone, Debug)]
pub struct HostArgs {
    /// Replica identity owning the shard
    #[arg(long)]
    pub identity: String,
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub port: u16,
}

impl From<&HostArgs> for ShardHost {
    fn from(value: &HostArgs) -> Self {
        ShardHost::new(value.identity.clone(), value.address.clone(), value.port)
    }
}
