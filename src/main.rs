use sdiff::{
    cli::{Cli, Context, ExitOnErr},
    config::Settings,
    utils,
};

#[tokio::main]
async fn main() {
    let settings = Settings::new().exit_on_err("Failed to load configuration");
    let cli = Cli::parse_args();

    utils::logger::init_logging(&settings.logs);

    cli.execute(&Context {
        settings: &settings,
    })
    .await;
}
