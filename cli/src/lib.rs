mod session_cmd;

use anyhow::Context;
use boardroom_interview::InterviewConfig;
use clap::Args;
use clap::Parser;
use std::path::PathBuf;

pub use session_cmd::SessionCommand;
pub use session_cmd::WorkflowChoice;

/// Board-of-advisors interviews from the command line.
#[derive(Debug, Parser)]
#[command(name = "boardroom", version)]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (YAML or TOML).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding sessions, entities and reports. Overrides the
    /// config file.
    #[arg(long = "data-dir", global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Whose sessions to work with. Overrides the config file.
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Accept every answer as given instead of asking for concrete examples.
    #[arg(long = "no-vagueness-check", global = true)]
    pub no_vagueness_check: bool,
}

impl GlobalArgs {
    pub fn load_config(&self) -> anyhow::Result<InterviewConfig> {
        let mut config = match &self.config {
            Some(path) => InterviewConfig::load(path)?,
            None => InterviewConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(
                std::path::absolute(dir)
                    .with_context(|| format!("failed to resolve {}", dir.display()))?,
            );
        }
        if let Some(user) = &self.user {
            config.user_id = user.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.global.load_config()?;
    tracing::debug!(
        data_dir = %config.resolved_data_dir().display(),
        user = %config.user_id,
        "loaded configuration"
    );
    session_cmd::execute(cli.command, &config, cli.global.no_vagueness_check).await
}
