use std::env;
use std::fs;

use book_digest::cli::{self, ChaptersCli};
use book_digest::config::{API_BASE_ENV, API_KEY_ENV, MODEL_ENV};
use clap::Parser;

// Changes the working directory and environment of the test process, so it
// stays the only test in this file.
#[test]
fn env_file_in_working_directory_feeds_the_cli() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".env"),
        "OPENAI_API_KEY=sk-from-file\nMODEL=gpt-4o-from-file\nOPENAI_BASE_URL=http://from-file/v1\n",
    )
    .unwrap();

    env::remove_var(API_KEY_ENV);
    env::remove_var(MODEL_ENV);
    env::set_var(API_BASE_ENV, "http://already-set/v1");
    env::set_current_dir(dir.path()).unwrap();

    let loaded = cli::load_dotenv().unwrap();
    assert_eq!(loaded.file_name().unwrap(), ".env");

    let cli = ChaptersCli::try_parse_from(["chapters", "--summarize", "books/My_Book.md"]).unwrap();
    assert_eq!(cli.model.as_deref(), Some("gpt-4o-from-file"));
    assert_eq!(cli.api_key.as_deref(), Some("sk-from-file"));
    assert_eq!(cli.api_base, "http://already-set/v1");
}
