use anyhow::{Context, Result};
use book_digest::chunking::BpeCounter;
use book_digest::cli::{self, ChaptersCli};
use book_digest::config::{DriverConfig, ProviderConfig, BOOKS_DIR};
use book_digest::summarize::{self, Driver, StdinPrompt};
use book_digest::OpenAiProvider;
use clap::{CommandFactory, Parser};
use std::io;
use tracing::debug;

fn main() -> Result<()> {
    let env_file = cli::load_dotenv();
    let cli = ChaptersCli::parse();
    cli::init_tracing(cli.verbose);
    if let Some(path) = &env_file {
        debug!(target: "book_digest", path = %path.display(), "loaded environment file");
    }

    if let Some(path) = &cli.list_chapters {
        summarize::list_chapters(path, &mut io::stdout().lock())?;
        return Ok(());
    }

    let Some(path) = &cli.summarize else {
        ChaptersCli::command().print_help()?;
        return Ok(());
    };

    let provider_config =
        ProviderConfig::new(cli.api_key.clone(), cli.model.clone(), &cli.api_base)?;
    let counter = BpeCounter::for_model(&provider_config.model)?;
    let provider = OpenAiProvider::new(provider_config)?;

    let books_root = std::env::current_dir()
        .context("Failed to read the working directory")?
        .join(BOOKS_DIR);
    let config = DriverConfig::new(books_root, &cli.prompt);

    let driver = Driver::new(&config, &provider, &counter);
    driver.summarize(
        path,
        cli.chapter,
        &mut StdinPrompt::new(),
        &mut io::stdout(),
    )?;

    Ok(())
}
