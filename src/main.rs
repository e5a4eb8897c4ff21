mod artifacts;
mod assembler;
mod cli;
mod commands;
mod error;
mod form;
mod model;
mod resolver;
mod store;
mod util;
mod workspace;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::BuilderError;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        let builder_error = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<BuilderError>());
        let status = builder_error.map_or(500, BuilderError::status_code);

        error!(error = %err, status, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(builder_error.map_or(1, BuilderError::exit_code));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload(args) => commands::store::upload(args),
        Commands::DeleteStore(args) => commands::store::delete(args),
        Commands::Schema(args) => commands::store::schema(args),
        Commands::Classes(args) => commands::lookup::classes(args),
        Commands::ResolveClass(args) => commands::lookup::resolve_class(args),
        Commands::Properties(args) => commands::lookup::properties(args),
        Commands::Create(args) => commands::create::run(args),
        Commands::List(args) => commands::artifacts::list(args),
        Commands::Download(args) => commands::artifacts::download(args),
        Commands::DeleteConfig(args) => commands::artifacts::delete(args),
        Commands::Health(args) => commands::health::run(args),
        Commands::Options => commands::lookup::options(),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
