use buddy_app::{
    app::{run, AppConfig},
    cli::{Cli, Command},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(weeks) = cli.weeks.filter(|weeks| *weeks > 0) {
        config.heatmap_weeks = weeks;
    }

    if let Err(err) = run(config, cli.command.unwrap_or(Command::Show)) {
        eprintln!("study_buddy: {err:#}");
        std::process::exit(1);
    }
}
