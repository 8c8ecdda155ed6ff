mod client;
mod types;

pub use client::{ClientError, MasterClient};
pub use types::{HostArgs, WrhCli, WrhCommands};

use serde_json::Value;
use wrh_models::ShardHost;

/// Execute one command and return the master's JSON answer.
pub async fn execute(cli: &WrhCli) -> Result<Value, ClientError> {
    let master = MasterClient::new(&cli.master_url)?;
    let request = match &cli.command {
        WrhCommands::AddHost { group, host } => {
            master.post(group, "/hosts").json(&ShardHost::from(host))
        }
        WrhCommands::RemoveHost { group, host } => {
            master.delete(group, "/hosts").json(&ShardHost::from(host))
        }
        WrhCommands::Publish { group } => master.post(group, "/pending/ready"),
        WrhCommands::Discard { group } => master.delete(group, "/pending"),
        WrhCommands::Current {
            group,
            identity,
            credential,
        } => MasterClient::with_credentials(
            master.get(group, "/current"),
            identity,
            credential,
        ),
        WrhCommands::Pending { group } => master.get(group, "/pending"),
        WrhCommands::Versions { group } => master.get(group, "/versions"),
    };
    MasterClient::send(request).await
}

pub async fn run(cli: WrhCli) -> anyhow::Result<()> {
    let value = execute(&cli).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
