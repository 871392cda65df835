use anyhow::{Context, Result};
use book_digest::cli::{self, ConvertCli};
use book_digest::config::BOOKS_DIR;
use book_digest::converter;
use clap::Parser;

fn main() -> Result<()> {
    let cli = ConvertCli::parse();
    cli::init_tracing(cli.verbose);

    let books_root = std::env::current_dir()
        .context("Failed to read the working directory")?
        .join(BOOKS_DIR);
    let report = converter::convert(&cli.input, &books_root)?;

    println!("Markdown file saved to: {}", report.output.display());
    Ok(())
}
