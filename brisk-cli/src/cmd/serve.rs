use anyhow::{Result, bail};
use brisk_dev_server::{LiveServer, LiveServerConfig};
use clap::{ArgMatches, Command};

use crate::config::{BriskConfig, project_args, server_args};

pub fn make_subcommand() -> Command {
    server_args(project_args(Command::new("serve"))).about("Serve the built site over HTTP")
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = BriskConfig::load(args)?;
    let output_dir = config.paths().output;

    if !output_dir.is_dir() {
        bail!(
            "{} does not exist, run `brisk build` first",
            output_dir.display()
        );
    }

    let server = LiveServer::new(LiveServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root: output_dir,
        open: config.server.open,
        live_reload: false,
    });

    server.run().await
}
