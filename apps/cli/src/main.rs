//! ConceptLens CLI: find and describe the concepts a text introduces.
//!
//! Extracts domain concepts from text, drops the ones already known, and
//! enriches the rest with a definition, synonyms, and an ontology match.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
