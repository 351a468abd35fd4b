//! edudash-cli: command-line client for the e-learning admin API.
//! Every command goes through the same cached query client the dashboard uses.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;

use clap::Parser;
use edudash::{config, telemetry};

use args::{Cli, Commands};
use client::{CliError, Ctx};
use handlers::{analytics, courses, documents, livestreams, raw, system, users};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = config::load(&cli.config)?;
    telemetry::init(&settings.logging)?;
    let ctx = Ctx::new(&settings)?;

    match cli.command {
        Commands::Endpoints => raw::endpoints(&ctx)?,
        Commands::Query(call) => raw::query(&ctx, call).await?,
        Commands::Mutate(call) => raw::mutate(&ctx, call).await?,
        Commands::Watch(watch) => raw::watch(&ctx, watch).await?,
        Commands::Courses(cmd) => courses::handle(&ctx, cmd.action).await?,
        Commands::Documents(cmd) => documents::handle(&ctx, cmd.action).await?,
        Commands::Livestreams(cmd) => livestreams::handle(&ctx, cmd.action).await?,
        Commands::Users(cmd) => users::handle(&ctx, cmd.action).await?,
        Commands::Analytics(cmd) => analytics::handle(&ctx, cmd.action).await?,
        Commands::System(cmd) => system::handle(&ctx, cmd.action).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
