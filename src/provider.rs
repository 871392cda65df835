use std::io::{BufRead, BufReader};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// Placeholder in the prompt template replaced by the context documents.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Separator between context documents.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Lazily produced completion tokens. Ends normally when the completion is
/// done; an `Err` item ends it early.
pub type TokenStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

pub trait SummaryProvider {
    /// Start a completion for `instruction` over `documents`.
    fn stream(&self, instruction: &str, documents: &[String]) -> Result<TokenStream<'_>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Turn the prompt template and documents into chat messages.
///
/// With a `{context}` placeholder the documents are rendered into a single
/// system message; otherwise the template is the system message and the
/// documents follow as one user message.
pub fn build_messages(template: &str, documents: &[String]) -> Vec<ChatMessage> {
    let context = documents.join(DOCUMENT_SEPARATOR);

    match render_template(template, &context) {
        Some(rendered) => vec![ChatMessage {
            role: "system",
            content: rendered,
        }],
        None => vec![
            ChatMessage {
                role: "system",
                content: template.to_string(),
            },
            ChatMessage {
                role: "user",
                content: context,
            },
        ],
    }
}

/// Substitute `{context}` and unescape `{{`/`}}`. `None` when the template
/// has no placeholder.
fn render_template(template: &str, context: &str) -> Option<String> {
    let mut out = String::with_capacity(template.len() + context.len());
    let mut substituted = false;
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("{{") {
            out.push('{');
            rest = &rest[2..];
        } else if rest.starts_with("}}") {
            out.push('}');
            rest = &rest[2..];
        } else if rest.starts_with(CONTEXT_PLACEHOLDER) {
            out.push_str(context);
            substituted = true;
            rest = &rest[CONTEXT_PLACEHOLDER.len()..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    substituted.then_some(out)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ApiError,
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        // Completions stream for as long as they take
        let client = Client::builder()
            .user_agent(concat!("book-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::provider(format!("client build: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: ProviderConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base)
    }
}

impl SummaryProvider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %self.config.model, documents = documents.len()))]
    fn stream(&self, instruction: &str, documents: &[String]) -> Result<TokenStream<'_>> {
        let url = self.endpoint();
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            stream: true,
            messages: build_messages(instruction, documents),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| Error::provider(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::provider(format!(
                "{url}: HTTP {status}: {}",
                error_message(&body)
            )));
        }

        debug!(%status, "completion stream opened");
        Ok(Box::new(SseTokens::new(BufReader::new(response))))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Completion tokens read from a server-sent event stream.
///
/// Only `data:` lines are read. `data: [DONE]` ends the stream, as does the
/// end of input.
pub struct SseTokens<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> SseTokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<Result<String>> {
        self.done = true;
        Some(Err(Error::provider(message)))
    }
}

impl<R: BufRead> Iterator for SseTokens<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {}
                Err(e) => return self.fail(format!("stream read failed: {e}")),
            }

            let Some(data) = self.line.trim_end().strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                self.done = true;
                break;
            }

            let chunk: StreamChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => return self.fail(format!("malformed stream chunk: {e}")),
            };
            if let Some(error) = chunk.error {
                return self.fail(error.message);
            }

            let token: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            if !token.is_empty() {
                return Some(Ok(token));
            }
        }
        None
    }
}
