use clap::Parser;
use townland_cli::Cli;
use townland_logging::TownlandSubscriberBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed
    let _guard = TownlandSubscriberBuilder::new()
        .with_config(cli.log_config())
        .try_init()?;

    let output = townland_cli::run(cli).await?;
    println!("{output}");
    Ok(())
}
