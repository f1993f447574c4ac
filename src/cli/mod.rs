mod commands;
mod prompt;

use clap::Parser;
use colored::Colorize;

pub use commands::ExitOnErr;
pub use prompt::PromptCredentials;

use crate::cli::commands::{
    Commands, cmd_catalog, cmd_compare, cmd_config, cmd_init, cmd_version,
};
use crate::config::Settings;

pub struct Context<'a> {
    pub settings: &'a Settings,
}

#[derive(Parser, Debug)]
#[command(
    name = "sdiff",
    about = "Schema comparison CLI",
    long_about = format!(
r#"{} - {}"#,
"SDIFF".green().bold(),
"Compare two database schemas and build a migration script from the differences.",
))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub async fn execute(&self, ctx: &Context<'_>) {
        match &self.command {
            Commands::Compare(args) => cmd_compare::execute(args, ctx).await,
            Commands::Catalog(args) => cmd_catalog::execute(args, ctx).await,
            Commands::Config => cmd_config::execute(ctx).await,
            Commands::Init(args) => cmd_init::execute(args, ctx).await,
            Commands::Version(action) => cmd_version::execute(action, ctx.settings).await,
        }
    }
}
