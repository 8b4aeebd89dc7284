//! End-to-end run engine tests against a mocked remote service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concierge::answer::Citation;
use concierge::client::AssistantsClient;
use concierge::engine::{PollPolicy, RunEngine, FALLBACK_ANSWER};
use concierge::session::Session;
use concierge::tools::{
    Tool, ToolArguments, ToolContext, ToolDescriptor, ToolInvocation, ToolParameters, ToolRegistry,
};

fn fast_poll() -> PollPolicy {
    PollPolicy {
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(10),
        multiplier: 1.5,
        budget: Duration::from_secs(2),
    }
}

fn engine_with(server: &MockServer, registry: ToolRegistry) -> (RunEngine, Arc<AssistantsClient>) {
    let client = Arc::new(AssistantsClient::new(server.uri(), "test-key", "gpt-test"));
    let engine = RunEngine::new(
        Arc::clone(&client),
        Arc::new(registry),
        "asst_1",
        fast_poll(),
    );
    (engine, client)
}

async fn session_with_thread(server: &MockServer, client: &Arc<AssistantsClient>) -> Session {
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thr_1"})))
        .mount(server)
        .await;
    let mut session = Session::new(Arc::clone(client));
    session.create_thread().await.unwrap();
    session
}

fn run_json(status: &str) -> serde_json::Value {
    json!({"id": "run_1", "status": status})
}

fn requires_action_json(calls: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "run_1",
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {"tool_calls": calls}
        }
    })
}

/// Retrieval stub returning two passages with citations.
struct StubRetrieval;

#[async_trait::async_trait]
impl Tool for StubRetrieval {
    fn name(&self) -> &str {
        "doc_search"
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "doc_search",
            "retrieval stub",
            ToolParameters::object().string("query", "q", true).build(),
        )
    }

    async fn invoke(
        &self,
        args: &ToolArguments,
        _ctx: &ToolContext,
    ) -> concierge::error::Result<ToolInvocation> {
        args.get_str("query")?;
        Ok(ToolInvocation::with_citations(
            json!([
                {"chunk": "Refunds are accepted within 30 days.", "title": "refund-policy.pdf"},
                {"chunk": "Contact support to start a refund.", "title": "refund-faq.pdf"},
            ]),
            vec![
                Citation::new(1, "refund-policy.pdf", "https://docs/refund-policy"),
                Citation::new(2, "refund-faq.pdf", "https://docs/refund-faq"),
            ],
        ))
    }
}

#[tokio::test]
async fn turn_with_retrieval_produces_two_citations_in_document_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .and(body_string_contains(r#""tool_choice":"required""#))
        .and(body_string_contains("doc_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requires_action_json(json!([
            {
                "id": "call_1",
                "type": "function",
                "function": {
                    "name": "doc_search",
                    "arguments": "{\"query\": \"What is the refund policy?\"}"
                }
            }
        ]))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs/run_1/submit_tool_outputs"))
        .and(body_string_contains("call_1"))
        .and(body_string_contains("Refunds are accepted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("completed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "msg_2",
                "role": "assistant",
                "run_id": "run_1",
                "content": [
                    {"type": "text", "text": {"value": "Refunds are accepted within 30 days "}},
                    {"type": "text", "text": {"value": "[1][2]."}}
                ]
            }]
        })))
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StubRetrieval));
    let (engine, client) = engine_with(&server, registry);
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    assert_eq!(turn.thread_id, "thr_1");
    assert_eq!(turn.answer, "Refunds are accepted within 30 days [1][2].");
    assert_eq!(
        turn.citations,
        vec![
            Citation::new(1, "refund-policy.pdf", "https://docs/refund-policy"),
            Citation::new(2, "refund-faq.pdf", "https://docs/refund-faq"),
        ]
    );
}

#[tokio::test]
async fn malformed_arguments_still_submit_an_error_output_and_continue() {
    let server = MockServer::start().await;

    let calls = Arc::new(AtomicUsize::new(0));

    struct Echo(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("echo", "echo stub", ToolParameters::empty())
        }

        async fn invoke(
            &self,
            _args: &ToolArguments,
            _ctx: &ToolContext,
        ) -> concierge::error::Result<ToolInvocation> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ToolInvocation::output(json!("echoed")))
        }
    }

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requires_action_json(json!([
            {
                "id": "call_bad",
                "type": "function",
                "function": {"name": "echo", "arguments": "{bad json"}
            }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs/run_1/submit_tool_outputs"))
        .and(body_string_contains("call_bad"))
        .and(body_string_contains("error"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("completed")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "msg_2",
                "role": "assistant",
                "run_id": "run_1",
                "content": [{"type": "text", "text": {"value": "I could not read the tool arguments."}}]
            }]
        })))
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(Echo(Arc::clone(&calls))));
    let (engine, client) = engine_with(&server, registry);
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    assert_eq!(turn.answer, "I could not read the tool arguments.");
    assert!(turn.citations.is_empty());
    // The malformed call never reached the tool itself.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn completed_run_without_assistant_message_yields_empty_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("completed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let (engine, client) = engine_with(&server, ToolRegistry::new());
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    assert_eq!(turn.answer, "");
    assert!(turn.citations.is_empty());
}

#[tokio::test]
async fn submission_failure_degrades_into_the_fallback_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requires_action_json(json!([
            {
                "id": "call_1",
                "type": "function",
                "function": {"name": "doc_search", "arguments": "{\"query\": \"q\"}"}
            }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs/run_1/submit_tool_outputs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StubRetrieval));
    let (engine, client) = engine_with(&server, registry);
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    assert_eq!(turn.answer, FALLBACK_ANSWER);
    assert!(turn.citations.is_empty());
}

#[tokio::test]
async fn polling_budget_exhaustion_degrades_into_the_fallback_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("in_progress")))
        .mount(&server)
        .await;

    let client = Arc::new(AssistantsClient::new(server.uri(), "test-key", "gpt-test"));
    let engine = RunEngine::new(
        Arc::clone(&client),
        Arc::new(ToolRegistry::new()),
        "asst_1",
        PollPolicy {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(5),
            multiplier: 1.0,
            budget: Duration::from_millis(40),
        },
    );
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    assert_eq!(turn.answer, FALLBACK_ANSWER);
}

#[tokio::test]
async fn failed_run_still_extracts_a_partial_assistant_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "upstream exploded"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "msg_2",
                "role": "assistant",
                "run_id": "run_1",
                "content": [{"type": "text", "text": {"value": "Partial answer before the failure."}}]
            }]
        })))
        .mount(&server)
        .await;

    let (engine, client) = engine_with(&server, ToolRegistry::new());
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    assert_eq!(turn.answer, "Partial answer before the failure.");
}

#[tokio::test]
async fn citations_merge_across_calls_deduplicated_and_gap_free() {
    let server = MockServer::start().await;

    struct FixedCitations {
        name: &'static str,
        citations: Vec<Citation>,
    }

    #[async_trait::async_trait]
    impl Tool for FixedCitations {
        fn name(&self) -> &str {
            self.name
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "citation stub", ToolParameters::empty())
        }

        async fn invoke(
            &self,
            _args: &ToolArguments,
            _ctx: &ToolContext,
        ) -> concierge::error::Result<ToolInvocation> {
            Ok(ToolInvocation::with_citations(
                json!("ok"),
                self.citations.clone(),
            ))
        }
    }

    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requires_action_json(json!([
            {"id": "call_1", "type": "function", "function": {"name": "first", "arguments": "{}"}},
            {"id": "call_2", "type": "function", "function": {"name": "second", "arguments": "{}"}}
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thr_1/runs/run_1/submit_tool_outputs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("completed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "msg_2",
                "role": "assistant",
                "run_id": "run_1",
                "content": [{"type": "text", "text": {"value": "Done [1][2]."}}]
            }]
        })))
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FixedCitations {
        name: "first",
        citations: vec![
            Citation::new(1, "a.pdf", "https://docs/a"),
            Citation::new(2, "b.pdf", "https://docs/b"),
        ],
    }));
    registry.register(Arc::new(FixedCitations {
        name: "second",
        citations: vec![
            // Same source as the first call; must not be re-added.
            Citation::new(1, "a.pdf", "https://docs/a"),
            Citation::new(2, "c.pdf", "https://docs/c"),
        ],
    }));
    let (engine, client) = engine_with(&server, registry);
    let session = session_with_thread(&server, &client).await;

    let turn = engine.execute_turn(&session).await;
    let ids: Vec<u32> = turn.citations.iter().map(|c| c.id).collect();
    let urls: Vec<&str> = turn.citations.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(urls, vec!["https://docs/a", "https://docs/b", "https://docs/c"]);
}
