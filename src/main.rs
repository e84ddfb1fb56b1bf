use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Instant};
#[allow(unused_imports)]
use tracing::*;
use tracing_subscriber::prelude::*;

use crate::{
    lexicon::Lexicon,
    nlp::{RulePipeline, Vocabulary},
    process::Processor,
    taxes::TaxTable,
};

mod entities;
mod extract;
mod lexicon;
mod model;
mod nlp;
mod post;
mod posting;
mod process;
mod table;
mod taxes;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    lexicon: Option<PathBuf>,
    #[arg(short, long, value_name = "FILE")]
    taxes: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    vocabulary: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Post(post::Command),
    Entities(entities::Command),
    Rules(table::Command),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fn get_rust_log(verbose: u8) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| {
            match verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
            .into()
        })
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log(cli.verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let get_processor = || -> Result<Processor> {
        let _span = span!(Level::INFO, "loading").entered();
        let started = Instant::now();
        let lexicon = match &cli.lexicon {
            Some(path) => Lexicon::load(path)?,
            None => Lexicon::standard()?,
        };
        let taxes = match &cli.taxes {
            Some(path) => TaxTable::load(path)?,
            None => TaxTable::standard()?,
        };
        let vocabulary = match &cli.vocabulary {
            Some(path) => Vocabulary::load(path)?,
            None => Vocabulary::standard()?,
        };
        let processor = Processor::new(
            Arc::new(lexicon),
            Arc::new(taxes),
            Arc::new(RulePipeline::new(vocabulary)),
        );
        let elapsed = Instant::now() - started;
        debug!("loaded configuration in {:?}", elapsed);
        Ok(processor)
    };

    match &cli.command {
        Some(Commands::Post(cmd)) => post::execute_command(&get_processor()?, cmd),
        Some(Commands::Entities(cmd)) => entities::execute_command(&get_processor()?, cmd),
        Some(Commands::Rules(cmd)) => table::execute_command(&get_processor()?, cmd),
        None => Ok(()),
    }
}
