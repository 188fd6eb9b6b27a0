use std::process;

use clap::Parser;
use pangenome_impute::cli::{Cli, Commands};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[macro_use]
extern crate log;

fn main() {
    let cli = Cli::parse();
    logger::Logger::init(cli.verbose + 1);
    cli.log();

    if let Err(e) = cli.serialize() {
        warn!("{e}");
    }

    let result = match &cli.commands {
        Commands::BuildIndex { args } => pangenome_impute::build_index(args),
        Commands::Impute { args } => pangenome_impute::impute(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
