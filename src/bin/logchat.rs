use anyhow::Result;
use clap::Parser;
use logchat::api::logging::init_tracing;
use logchat::app::{App, Cli};
use logchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    cli.apply(&mut config);
    config.validate()?;

    let app = App::new(config, &cli).await?;
    match cli.ask.as_deref() {
        Some(question) => app.ask_once(question).await?,
        None => app.run().await?,
    }

    Ok(())
}
