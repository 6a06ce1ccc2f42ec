//! Integration tests for the webhook API.
//!
//! Each test builds its own router over a scripted dialog backend, so no
//! network access is needed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use gaction_api::error::ErrorBody;
use gaction_api::handlers::{HealthResponse, ReloadResponse};
use gaction_api::{create_router, AppState, ConnectorRegistry, StaticConnectorStore};
use gaction_bridge::{BackendError, DialogBackend, DialogReply, DialogRequest};
use gaction_core::BotConnection;

// =============================================================================
// Helpers
// =============================================================================

const TOKEN: &str = "recast-token";
const SPEAKER: &str = "actions.capability.AUDIO_OUTPUT";
const SCREEN: &str = "actions.capability.SCREEN_OUTPUT";

/// Dialog backend replaying queued replies. `Err` entries simulate a failure.
#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Value, String>>>,
    requests: Mutex<Vec<DialogRequest>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn replying(replies: Vec<Result<Value, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> DialogRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl DialogBackend for ScriptedBackend {
    async fn dialog(
        &self,
        _bot_token: &str,
        request: &DialogRequest,
    ) -> Result<DialogReply, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(serde_json::from_value(value).unwrap()),
            Some(Err(message)) => Err(BackendError::Transport(message)),
            None => Err(BackendError::Transport("no scripted reply".to_string())),
        }
    }
}

fn reply(messages: Value, memory: Value) -> Result<Value, String> {
    Ok(json!({"messages": messages, "conversation": {"memory": memory}}))
}

fn ssml(body: &str) -> String {
    format!("<speak><prosody pitch='0st' rate='100%'>{}</prosody></speak>", body)
}

fn connection() -> BotConnection {
    BotConnection {
        recast_bot_token: TOKEN.to_string(),
        auto_change_surface: true,
        ..BotConnection::default()
    }
}

fn make_app(connections: Vec<BotConnection>, backend: Arc<ScriptedBackend>) -> axum::Router {
    let registry = ConnectorRegistry::new(Arc::new(StaticConnectorStore::new(connections)), backend);
    create_router(AppState::new(registry, 1024 * 1024))
}

/// Actions SDK request body for a speaker that owns a phone.
fn google_request(intent: &str, query: &str, user_storage: Option<&str>) -> Value {
    let mut body = json!({
        "user": {"locale": "en-US"},
        "conversation": {"conversationId": "10000", "type": "ACTIVE"},
        "inputs": [{
            "intent": intent,
            "rawInputs": [{"inputType": "VOICE", "query": query}],
            "arguments": []
        }],
        "surface": {"capabilities": [{"name": SPEAKER}]},
        "availableSurfaces": [{"capabilities": [{"name": SPEAKER}, {"name": SCREEN}]}]
    });
    if let Some(storage) = user_storage {
        body["user"]["userStorage"] = json!(storage);
    }
    body
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook_uri() -> String {
    format!("/recast?botToken={}", TOKEN)
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn prompt_items(response: &Value) -> &Value {
    &response["expectedInputs"][0]["inputPrompt"]["richInitialPrompt"]["items"]
}

// =============================================================================
// Health and administration
// =============================================================================

#[tokio::test]
async fn test_health_reports_connectors() {
    let app = make_app(vec![connection()], ScriptedBackend::replying(vec![]));

    let reload = app
        .clone()
        .oneshot(Request::post("/connectors/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(reload.status(), StatusCode::OK);
    let reloaded: ReloadResponse = serde_json::from_slice(&body_bytes(reload).await).unwrap();
    assert_eq!(reloaded.connectors, 1);

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.connectors, 1);
    assert!(!health.version.is_empty());
}

// =============================================================================
// Webhook
// =============================================================================

#[tokio::test]
async fn test_adjacent_texts_are_spoken_once() {
    let backend = ScriptedBackend::replying(vec![reply(
        json!([
            {"type": "text", "content": "Hello"},
            {"type": "text", "content": "there"}
        ]),
        json!({"city": "Paris"}),
    )]);
    let app = make_app(vec![connection()], backend.clone());

    let resp = app
        .oneshot(post_json(&webhook_uri(), &google_request("actions.intent.TEXT", "hi", None)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let response = body_json(resp).await;

    assert_eq!(response["expectUserResponse"], json!(true));
    assert_eq!(
        prompt_items(&response),
        &json!([{"simpleResponse": {"textToSpeech": ssml("Hello there")}}])
    );
    assert_eq!(
        response["expectedInputs"][0]["possibleIntents"],
        json!([{"intent": "actions.intent.TEXT"}])
    );

    let storage: Value =
        serde_json::from_str(response["userStorage"].as_str().unwrap()).unwrap();
    assert_eq!(storage["data"], json!({"city": "Paris"}));

    let request = backend.last_request();
    assert_eq!(request.input.content, "hi");
    assert_eq!(request.language, "en");
    assert_eq!(request.conversation_id, "10000");
}

#[tokio::test]
async fn test_card_on_speaker_switches_surface_then_replays() {
    let backend = ScriptedBackend::replying(vec![reply(
        json!([{
            "type": "card",
            "content": {
                "title": "CARD_TITLE",
                "subtitle": "CARD_SUBTITLE",
                "imageUrl": "IMAGE_URL",
                "buttons": [{"title": "BUTTON_TITLE", "type": "web_url", "value": "https://example.com"}]
            }
        }]),
        json!({}),
    )]);
    let app = make_app(vec![connection()], backend.clone());

    let resp = app
        .clone()
        .oneshot(post_json(&webhook_uri(), &google_request("actions.intent.TEXT", "show me", None)))
        .await
        .unwrap();
    let first = body_json(resp).await;

    assert_eq!(prompt_items(&first), &json!([]));
    let intent = &first["expectedInputs"][0]["possibleIntents"][0];
    assert_eq!(intent["intent"], json!("actions.intent.NEW_SURFACE"));
    assert_eq!(intent["inputValueData"]["context"], json!("CARD_TITLE"));
    assert_eq!(intent["inputValueData"]["capabilities"], json!([SCREEN]));

    // The user accepts on the phone, which now has a screen.
    let storage = first["userStorage"].as_str().unwrap().to_string();
    let mut accepted = google_request("actions.intent.NEW_SURFACE", "", Some(&storage));
    accepted["surface"]["capabilities"] = json!([{"name": SPEAKER}, {"name": SCREEN}]);
    accepted["inputs"][0]["arguments"] = json!([{
        "name": "NEW_SURFACE",
        "extension": {"@type": "type.googleapis.com/google.actions.v2.NewSurfaceValue", "status": "OK"}
    }]);

    let resp = app
        .oneshot(post_json(&webhook_uri(), &accepted))
        .await
        .unwrap();
    let second = body_json(resp).await;

    assert_eq!(
        prompt_items(&second),
        &json!([{"basicCard": {
            "title": "CARD_TITLE",
            "subtitle": "CARD_SUBTITLE",
            "image": {"url": "IMAGE_URL", "accessibilityText": "image"},
            "buttons": [{"title": "BUTTON_TITLE", "openUrlAction": {"url": "https://example.com"}}]
        }}])
    );
    assert_eq!(backend.calls(), 1);

    let storage: Value =
        serde_json::from_str(second["userStorage"].as_str().unwrap()).unwrap();
    assert!(storage["bridge"]["pending_surface_switch"].is_null());
}

#[tokio::test]
async fn test_backend_failure_speaks_default_message() {
    let backend = ScriptedBackend::replying(vec![Err("connection refused".to_string())]);
    let mut french = connection();
    french
        .default_error_messages
        .insert("fr-FR".to_string(), "Oups, réessayez.".to_string());
    let app = make_app(vec![french], backend);

    let mut body = google_request("actions.intent.TEXT", "bonjour", None);
    body["user"]["locale"] = json!("fr-FR");
    let resp = app.oneshot(post_json(&webhook_uri(), &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let response = body_json(resp).await;

    assert_eq!(response["expectUserResponse"], json!(true));
    assert_eq!(
        prompt_items(&response),
        &json!([{"simpleResponse": {"textToSpeech": ssml("Oups, <break time='200ms'/>réessayez.")}}])
    );
}

#[tokio::test]
async fn test_backend_failure_without_message_closes() {
    let backend = ScriptedBackend::replying(vec![Err("timeout".to_string())]);
    let app = make_app(vec![connection()], backend);

    let resp = app
        .oneshot(post_json(&webhook_uri(), &google_request("actions.intent.TEXT", "hi", None)))
        .await
        .unwrap();
    let response = body_json(resp).await;
    assert_eq!(response["expectUserResponse"], json!(false));
    assert_eq!(response["finalResponse"]["richResponse"]["items"], json!([]));
}

#[tokio::test]
async fn test_unknown_token_is_not_found_without_backend_call() {
    let backend = ScriptedBackend::replying(vec![]);
    let app = make_app(vec![connection()], backend.clone());

    let resp = app
        .oneshot(post_json(
            "/recast?botToken=unknown",
            &google_request("actions.intent.TEXT", "hi", None),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let error: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(error.error, "not_found");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_missing_token_is_not_found() {
    let app = make_app(vec![connection()], ScriptedBackend::replying(vec![]));
    let resp = app
        .oneshot(post_json("/recast", &google_request("actions.intent.TEXT", "hi", None)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let backend = ScriptedBackend::replying(vec![]);
    let app = make_app(vec![connection()], backend.clone());

    let resp = app
        .oneshot(
            Request::post(webhook_uri())
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_health_check_request_skips_backend() {
    let backend = ScriptedBackend::replying(vec![]);
    let app = make_app(vec![connection()], backend.clone());

    let mut body = google_request("actions.intent.MAIN", "", None);
    body["inputs"][0]["arguments"] = json!([{"name": "is_health_check", "boolValue": true}]);
    let resp = app.oneshot(post_json(&webhook_uri(), &body)).await.unwrap();
    let response = body_json(resp).await;

    assert_eq!(
        prompt_items(&response),
        &json!([{"simpleResponse": {"textToSpeech": "Hi, Google Crawler"}}])
    );
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_close_flag_ends_conversation() {
    let backend = ScriptedBackend::replying(vec![reply(
        json!([
            {"type": "text", "content": "Goodbye"},
            {"type": "quickReplies", "content": {"title": "Anything else?", "buttons": [{"title": "no", "value": "no"}]}}
        ]),
        json!({"CLOSE_CONVERSATION": true}),
    )]);
    let app = make_app(vec![connection()], backend.clone());

    let resp = app
        .oneshot(post_json(&webhook_uri(), &google_request("actions.intent.CANCEL", "stop", None)))
        .await
        .unwrap();
    let response = body_json(resp).await;

    assert_eq!(response["expectUserResponse"], json!(false));
    assert!(response.get("expectedInputs").is_none());
    let rich = &response["finalResponse"]["richResponse"];
    assert_eq!(rich["items"].as_array().unwrap().len(), 2);
    assert!(rich.get("suggestions").is_none());

    let sent = backend.last_request().memory;
    assert_eq!(sent.get("GOOGLE_INTENT"), Some(&json!("actions.intent.CANCEL")));
    assert_eq!(sent.get("CLOSE_CONVERSATION"), Some(&json!(true)));
}

#[tokio::test]
async fn test_memory_round_trips_through_user_storage() {
    let backend = ScriptedBackend::replying(vec![
        reply(json!([{"type": "text", "content": "one"}]), json!({"step": 1})),
        reply(json!([{"type": "text", "content": "two"}]), json!({"step": 2})),
    ]);
    let app = make_app(vec![connection()], backend.clone());

    let resp = app
        .clone()
        .oneshot(post_json(&webhook_uri(), &google_request("actions.intent.MAIN", "", None)))
        .await
        .unwrap();
    let first = body_json(resp).await;
    let storage = first["userStorage"].as_str().unwrap().to_string();

    app.oneshot(post_json(
        &webhook_uri(),
        &google_request("actions.intent.TEXT", "next", Some(&storage)),
    ))
    .await
    .unwrap();

    let sent = backend.last_request().memory;
    assert_eq!(sent.get("step"), Some(&json!(1)));
    assert_eq!(sent.get("SCREEN_CAPACITY"), Some(&json!(false)));
}
