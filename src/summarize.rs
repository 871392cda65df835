use std::fs;
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::chapters::extract_chapters;
use crate::chunking::{split_text, TokenCounter};
use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::provider::{SummaryProvider, TokenStream};
use crate::title::{chapter_file_name, display_title};

/// Decides after each summarized chapter whether to go on.
pub trait ContinuePrompt {
    /// `chapter` is the 1-based number of the chapter just finished.
    fn proceed(&mut self, chapter: usize) -> Result<bool>;
}

impl<F: FnMut(usize) -> bool> ContinuePrompt for F {
    fn proceed(&mut self, chapter: usize) -> Result<bool> {
        Ok(self(chapter))
    }
}

/// Asks on the terminal; only an exact `y` continues.
pub struct StdinPrompt<R, W> {
    input: R,
    output: W,
}

impl StdinPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn new() -> Self {
        Self::with_io(io::stdin().lock(), io::stdout())
    }
}

impl Default for StdinPrompt<io::StdinLock<'static>, io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead, W: Write> StdinPrompt<R, W> {
    pub fn with_io(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ContinuePrompt for StdinPrompt<R, W> {
    fn proceed(&mut self, _chapter: usize) -> Result<bool> {
        write!(
            self.output,
            "Do you want to continue with the next chapter? (y/n):"
        )
        .and_then(|()| self.output.flush())
        .map_err(Error::terminal)?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .map_err(Error::terminal)?;
        Ok(answer.trim_end_matches(['\n', '\r']) == "y")
    }
}

/// Forward every token to `sink` as it arrives and return the whole text.
pub fn collect_stream(tokens: TokenStream<'_>, sink: &mut dyn Write) -> Result<String> {
    let mut summary = String::new();
    for token in tokens {
        let token = token?;
        sink.write_all(token.as_bytes())
            .and_then(|()| sink.flush())
            .map_err(Error::terminal)?;
        summary.push_str(&token);
    }
    Ok(summary)
}

/// Print `<n>. <Display Title>` for every chapter of `markdown`.
pub fn list_chapters(markdown: &Path, out: &mut dyn Write) -> Result<()> {
    for (i, chapter) in extract_chapters(markdown)?.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, display_title(&chapter.title)).map_err(Error::terminal)?;
    }
    Ok(())
}

/// Runs summarization over the chapters of one book.
pub struct Driver<'a> {
    config: &'a DriverConfig,
    provider: &'a dyn SummaryProvider,
    counter: &'a dyn TokenCounter,
}

impl<'a> Driver<'a> {
    pub fn new(
        config: &'a DriverConfig,
        provider: &'a dyn SummaryProvider,
        counter: &'a dyn TokenCounter,
    ) -> Self {
        Self {
            config,
            provider,
            counter,
        }
    }

    /// Summarize the chapters of `markdown`, writing one file per chapter
    /// into `<books_root>/<book name>/`.
    ///
    /// With `chapter` set only that chapter is summarized. Otherwise chapters
    /// are summarized in order until `confirm` declines. Returns the files
    /// written. A provider failure aborts the run; files already written stay.
    #[instrument(skip_all, fields(markdown = %markdown.display(), chapter = ?chapter))]
    pub fn summarize(
        &self,
        markdown: &Path,
        chapter: Option<NonZeroUsize>,
        confirm: &mut dyn ContinuePrompt,
        out: &mut dyn Write,
    ) -> Result<Vec<PathBuf>> {
        let book_dir = self.create_book_dir(markdown)?;
        let instruction = load_prompt(&self.config.prompt_path)?;
        let chapters = extract_chapters(markdown)?;

        let mut written = Vec::new();
        for (index, current) in chapters.iter().enumerate() {
            let number = index + 1;
            if chapter.is_some_and(|wanted| wanted.get() != number) {
                continue;
            }

            let title = display_title(&current.title);
            writeln!(out, "Summarizing: {title}").map_err(Error::terminal)?;

            let summary = self.summarize_chapter(&current.body, &instruction, out)?;
            let path = book_dir.join(chapter_file_name(number, &title));
            write_artifact(&path, &title, &summary)?;
            info!(number, path = %path.display(), "summary saved");

            writeln!(out, "\n\nSaved summary to: {}\n", path.display())
                .map_err(Error::terminal)?;
            written.push(path);

            if chapter.is_some() || !confirm.proceed(number)? {
                break;
            }
        }

        writeln!(out, "\nSummarization complete.").map_err(Error::terminal)?;
        Ok(written)
    }

    fn summarize_chapter(
        &self,
        body: &str,
        instruction: &str,
        out: &mut dyn Write,
    ) -> Result<String> {
        let documents = split_text(body, &self.config.chunking, self.counter);
        let tokens = self.provider.stream(instruction, &documents)?;
        collect_stream(tokens, out)
    }

    fn create_book_dir(&self, markdown: &Path) -> Result<PathBuf> {
        let name = markdown
            .file_stem()
            .ok_or_else(|| Error::config(format!("{} has no file name", markdown.display())))?;
        let dir = self.config.books_root.join(name);
        fs::create_dir_all(&dir).map_err(|e| Error::fs(&dir, e))?;
        Ok(dir)
    }
}

pub fn load_prompt(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::MissingPrompt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_artifact(path: &Path, title: &str, summary: &str) -> Result<()> {
    fs::write(path, format!("# {title}\n\n{summary}")).map_err(|e| Error::fs(path, e))
}
