use std::path::Path;

use clap::Args;
use inquire::Confirm;
use tracing::info;

use crate::{
    cli::{Context, commands::ExitOnErr},
    utils::init::{get_env_file_with_defaults, get_sample_catalog},
};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing .env file without asking
    #[arg(short, long, default_value_t = false)]
    pub force: bool,
}

pub async fn execute(args: &InitArgs, ctx: &Context<'_>) {
    init_env_file(args.force, &ctx.settings.engine.catalog_path);
    init_catalog(&ctx.settings.engine.catalog_path);
}

fn init_env_file(force: bool, catalog_path: &str) {
    let env_file = get_env_file_with_defaults("env.default.jinja", catalog_path)
        .exit_on_err("Failed to get env file");

    if Path::new(".env").exists() && !force {
        let should_overwrite =
            Confirm::new("A .env file already exists. Do you want to overwrite it?")
                .with_default(false)
                .prompt()
                .unwrap_or(false);

        if !should_overwrite {
            println!("Keeping existing .env file.");
            return;
        }
    }

    std::fs::write(".env", env_file).exit_on_err("Failed to create .env file");
    println!("✅ Successfully created .env file.");
}

fn init_catalog(catalog_path: &str) {
    let path = Path::new(catalog_path);
    if path.exists() {
        info!(path = %path.display(), "Catalog already present");
        return;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).exit_on_err("Failed to create catalog directory");
    }

    let catalog = get_sample_catalog().exit_on_err("Failed to load sample catalog");
    std::fs::write(path, catalog).exit_on_err("Failed to write sample catalog");
    println!("✅ Sample catalog written to {}", path.display());
}
