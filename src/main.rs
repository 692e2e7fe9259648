use anyhow::Result;
use clap::Parser;

mod app;
mod cli;
mod handler;
#[cfg(test)]
mod test_support;

use app::App;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut app = App::new(&cli)?;

    let mut stdout = std::io::stdout();
    handler::handle_command(&mut app, cli.command, &mut stdout).await?;

    Ok(())
}
