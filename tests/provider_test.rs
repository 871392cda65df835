use book_digest::{Error, OpenAiProvider, ProviderConfig, Result, SummaryProvider};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS: &str = "/v1/chat/completions";

fn event_stream(events: &[&str]) -> ResponseTemplate {
    let body: String = events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect();
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

/// Run one completion against `server` on a blocking thread; the provider's
/// client must not live inside the async runtime.
async fn complete(
    server: &MockServer,
    instruction: &'static str,
    documents: Vec<String>,
) -> Result<Vec<Result<String>>> {
    let base = format!("{}/v1", server.uri());
    tokio::task::spawn_blocking(move || -> Result<Vec<Result<String>>> {
        let config = ProviderConfig::new(
            Some("sk-test".into()),
            Some("gpt-4o-mini".into()),
            base,
        )?;
        let client = Client::builder().no_proxy().build().unwrap();
        let provider = OpenAiProvider::with_client(config, client);
        let tokens = provider.stream(instruction, &documents)?;
        Ok(tokens.collect())
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn streams_tokens_from_chat_completions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "temperature": 0.0,
        })))
        .respond_with(event_stream(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"A short "}}]}"#,
            r#"{"choices":[{"delta":{"content":"summary."}}]}"#,
            "[DONE]",
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let documents = vec!["first part".to_string(), "second part".to_string()];
    let tokens: Vec<String> = complete(&server, "Summarize:\n{context}", documents)
        .await
        .unwrap()
        .into_iter()
        .map(|token| token.unwrap())
        .collect();
    assert_eq!(tokens, vec!["A short ", "summary."]);

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["messages"],
        json!([{"role": "system", "content": "Summarize:\nfirst part\n\nsecond part"}])
    );
}

#[tokio::test]
async fn template_without_placeholder_sends_a_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(event_stream(&["[DONE]"]))
        .mount(&server)
        .await;

    let tokens = complete(&server, "Summarize this chapter.", vec!["body".into()])
        .await
        .unwrap();
    assert!(tokens.is_empty());

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "Summarize this chapter."},
            {"role": "user", "content": "body"}
        ])
    );
}

#[tokio::test]
async fn error_status_carries_the_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error"
            }
        })))
        .mount(&server)
        .await;

    let err = complete(&server, "Summarize.", vec!["text".into()])
        .await
        .unwrap_err();

    match err {
        Error::Provider(message) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.ends_with("Incorrect API key provided"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn error_event_ends_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(event_stream(&[
            r#"{"choices":[{"delta":{"content":"Half"}}]}"#,
            r#"{"error":{"message":"The server had an error while processing your request"}}"#,
            r#"{"choices":[{"delta":{"content":"never"}}]}"#,
        ]))
        .mount(&server)
        .await;

    let items = complete(&server, "Summarize.", vec!["text".into()])
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "Half");
    assert!(matches!(&items[1], Err(Error::Provider(m)) if m.starts_with("The server had")));
}
