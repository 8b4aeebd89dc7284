//! Session tests against a mocked remote service.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concierge::client::AssistantsClient;
use concierge::error::ConciergeError;
use concierge::session::Session;
use concierge::tools::ConversationView;

fn client(server: &MockServer) -> Arc<AssistantsClient> {
    Arc::new(AssistantsClient::new(server.uri(), "test-key", "gpt-test"))
}

#[tokio::test]
async fn create_thread_stores_the_new_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thr_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::new(client(&server));
    let thread_id = session.create_thread().await.unwrap();
    assert_eq!(thread_id, "thr_1");
    assert_eq!(session.thread_id(), Some("thr_1"));
}

#[tokio::test]
async fn resume_validates_thread_exists_server_side() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_known"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thr_known"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::new(client(&server));
    session.resume_thread("thr_known").await.unwrap();
    assert_eq!(session.thread_id(), Some("thr_known"));
}

#[tokio::test]
async fn resume_unknown_thread_fails_and_appends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_doesnotexist"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "No thread found"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thr_doesnotexist/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = Session::new(client(&server));
    let err = session.resume_thread("thr_doesnotexist").await.unwrap_err();
    assert!(matches!(err, ConciergeError::ThreadNotFound(_)));
    assert_eq!(session.thread_id(), None);

    let err = session.append_user_message("hello").await.unwrap_err();
    assert!(matches!(err, ConciergeError::NoActiveThread));
}

#[tokio::test]
async fn append_posts_a_user_role_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thr_1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thr_1/messages"))
        .and(body_string_contains(r#""role":"user""#))
        .and(body_string_contains("What is the refund policy?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "role": "user",
            "content": [{"type": "text", "text": {"value": "What is the refund policy?"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::new(client(&server));
    session.create_thread().await.unwrap();
    session
        .append_user_message("What is the refund policy?")
        .await
        .unwrap();
}

#[tokio::test]
async fn view_reads_the_transcript_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thr_1"})))
        .mount(&server)
        .await;
    // Newest first, as the service lists them.
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{"type": "text", "text": {"value": "Hi, how can I help?"}}]
                },
                {
                    "id": "msg_1",
                    "role": "user",
                    "content": [{"type": "text", "text": {"value": "Hello"}}]
                }
            ]
        })))
        .mount(&server)
        .await;

    let mut session = Session::new(client(&server));
    session.create_thread().await.unwrap();

    let view = session.view().unwrap();
    let transcript = view.transcript().await.unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].text, "Hello");
    assert_eq!(transcript[1].text, "Hi, how can I help?");
}

#[tokio::test]
async fn summarize_asks_the_model_over_user_messages_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thr_1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thr_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{"type": "text", "text": {"value": "Sure."}}]
                },
                {
                    "id": "msg_1",
                    "role": "user",
                    "content": [{"type": "text", "text": {"value": "My VPN is broken"}}]
                }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("My VPN is broken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "User needs VPN help.  "}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = Session::new(client(&server));
    session.create_thread().await.unwrap();

    let view = session.view().unwrap();
    let summary = view.summarize("summarize this").await.unwrap();
    assert_eq!(summary, "User needs VPN help.");
}
