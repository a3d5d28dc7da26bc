use clap::Parser;
use std::path::PathBuf;

/// Agentcloud forms service - connector forms and validation chains over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "agentcloud", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "AGENTCLOUD_CONFIG", default_value = "agentcloud.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "AGENTCLOUD_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "AGENTCLOUD_PORT")]
    pub port: Option<u16>,

    /// Load and validate the configuration, then exit
    #[arg(long, env = "AGENTCLOUD_CHECK")]
    pub check: bool,
}
