use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use planforge::gateway::groq::{ChatProvider, GroqAdapter};
use planforge::gateway::{
    Attribution, ChatModel, ChatRequest, FinishReason, GatewayConfig, GroqConfig, Message,
    NoopUsageSink, ProviderError, ProviderGateway,
};

fn adapter(server: &MockServer) -> GroqAdapter {
    GroqAdapter::new(
        GroqConfig::new("sk-test")
            .base_url(server.uri())
            .timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        ChatModel::groq("llama-3.3-70b-versatile"),
        vec![Message::user("hi")],
        Attribution::new("test"),
    )
}

fn no_delay_config(max_retries: u32) -> GatewayConfig {
    GatewayConfig {
        max_retries,
        retry_base_delay: Duration::ZERO,
        retry_max_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn groq_parses_success_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "hello" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 20 }
        })))
        .mount(&server)
        .await;

    let resp = adapter(&server).chat(&request()).await.unwrap();
    assert_eq!(resp.content, "hello");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 10);
    assert_eq!(resp.output_tokens, 20);
}

#[tokio::test]
async fn groq_classifies_429_and_parses_retry_after_seconds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .insert_header("x-request-id", "abc123")
                .set_body_json(json!({
                    "error": { "message": "rate limited" }
                })),
        )
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    match err {
        ProviderError::RateLimited {
            retry_after,
            context,
        } => {
            assert_eq!(retry_after, Duration::from_secs(7));
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(429));
            assert_eq!(ctx.request_id.as_deref(), Some("abc123"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn groq_parses_http_date_retry_after() {
    let server = MockServer::start().await;
    let when = (Utc::now() + chrono::Duration::seconds(90)).to_rfc2822();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", when.as_str())
                .set_body_json(json!({"error": {"message": "rate limited"}})),
        )
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after, .. } => {
            assert!(retry_after >= Duration::from_secs(80));
            assert!(retry_after <= Duration::from_secs(90));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_surfaces_rate_limit_after_exhausting_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "5")
                .set_body_json(json!({"error": {"message": "rate limited"}})),
        )
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter(&server),
        Arc::new(NoopUsageSink),
        no_delay_config(0),
    );

    let err = gateway.chat(request()).await.unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after, .. } => {
            assert!(retry_after >= Duration::from_secs(5));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_wait_hint_is_at_least_one_second() {
    let server = MockServer::start().await;

    // No Retry-After header at all: the hint still has a sane floor.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "rate limited" }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after, .. } => {
            assert!(retry_after >= Duration::from_secs(1));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn non_retryable_4xx_fails_without_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "bad temperature" }
        })))
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter(&server),
        Arc::new(NoopUsageSink),
        no_delay_config(3),
    );

    let err = gateway.chat(request()).await.unwrap_err();
    match err {
        ProviderError::Provider {
            retryable, message, ..
        } => {
            assert!(!retryable);
            assert!(message.contains("400"));
            assert!(message.contains("bad temperature"));
        }
        other => panic!("expected Provider, got {other:?}"),
    }

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[derive(Clone)]
struct FlipResponder {
    calls: Arc<AtomicUsize>,
    first: ResponseTemplate,
    second: ResponseTemplate,
}

impl Respond for FlipResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            self.first.clone()
        } else {
            self.second.clone()
        }
    }
}

#[tokio::test]
async fn gateway_retries_5xx_and_succeeds() {
    let server = MockServer::start().await;

    let first = ResponseTemplate::new(500).set_body_json(json!({
        "error": { "message": "transient error" }
    }));
    let second = ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "content": "ok" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
    }));

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FlipResponder {
            calls: Arc::new(AtomicUsize::new(0)),
            first,
            second,
        })
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter(&server),
        Arc::new(NoopUsageSink),
        no_delay_config(1),
    );

    let resp = gateway.chat(request()).await.unwrap();
    assert_eq!(resp.content, "ok");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn exhausted_5xx_carries_last_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "message": "backend overloaded" }
        })))
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter(&server),
        Arc::new(NoopUsageSink),
        no_delay_config(1),
    );

    let err = gateway.chat(request()).await.unwrap_err();
    match err {
        ProviderError::Provider {
            retryable,
            message,
            context,
            ..
        } => {
            assert!(retryable);
            assert!(message.contains("503"));
            assert!(message.contains("backend overloaded"));
            assert_eq!(context.unwrap().http_status, Some(503));
        }
        other => panic!("expected Provider, got {other:?}"),
    }

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}
