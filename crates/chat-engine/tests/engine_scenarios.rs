//! End-to-end engine scenarios against a scripted gateway.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chat_engine::{
    async_trait, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatStatus,
    ConversationEngine, EngineConfig, Message, ModelGateway, NudgeError, ToolCall,
};
use nudge_core::{
    ConversationInfo, MemoryTranscriptStore, NewMessage, StoredMessage, TranscriptStore,
};
use serde_json::{json, Value};
use status_tools::StatusToolExecutor;
use tokio::sync::Notify;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Replays canned responses and records every request.
#[derive(Default)]
struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, NudgeError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedGateway {
    fn new(responses: Vec<Result<ChatCompletionResponse, NudgeError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NudgeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NudgeError::Network("script exhausted".to_string())))
    }
}

fn reply(text: &str) -> Result<ChatCompletionResponse, NudgeError> {
    Ok(serde_json::from_value(json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    }))
    .unwrap())
}

fn tool_calls(calls: &[(&str, &str, &str)]) -> Result<ChatCompletionResponse, NudgeError> {
    let calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": args }
            })
        })
        .collect();
    Ok(serde_json::from_value(json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": null, "tool_calls": calls },
            "finish_reason": "tool_calls"
        }]
    }))
    .unwrap())
}

fn config() -> EngineConfig {
    EngineConfig::builder()
        .access_token("test-token")
        .system_prompt("You are Nudge.")
        .build()
}

fn engine(gateway: &Arc<ScriptedGateway>) -> ConversationEngine<Arc<ScriptedGateway>> {
    ConversationEngine::new(config(), gateway.clone(), StatusToolExecutor::new())
}

/// Every tool message must answer a tool call issued earlier in the payload.
fn assert_tool_results_paired(messages: &[ChatMessage]) {
    let mut issued = Vec::new();
    for message in messages {
        match message {
            ChatMessage::Assistant { tool_calls, .. } => {
                issued.extend(tool_calls.iter().map(|c| c.id.clone()));
            }
            ChatMessage::Tool { tool_call_id, .. } => {
                let pos = issued
                    .iter()
                    .position(|id| id == tool_call_id)
                    .unwrap_or_else(|| panic!("orphaned tool message {}", tool_call_id));
                issued.remove(pos);
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_block_instagram_scenario() {
    init_tracing();
    let gateway = ScriptedGateway::new(vec![
        tool_calls(&[("call_1", "set_status", r#"{"blocked":1}"#)]),
        reply("done, blocked it 🚫"),
    ]);
    let engine = engine(&gateway);
    let before = engine.transcript().await.len();

    let answer = engine.submit("block instagram now").await.unwrap();
    assert_eq!(answer, "done, blocked it 🚫");

    let transcript = engine.transcript().await;
    assert_eq!(transcript.len() - before, 4);
    assert_eq!(transcript[1], Message::user("block instagram now"));
    assert!(transcript[2].is_tool_step());
    match &transcript[3] {
        Message::Tool {
            tool_call_id,
            content,
        } => {
            assert_eq!(tool_call_id, "call_1");
            let result: Value = serde_json::from_str(content).unwrap();
            assert_eq!(result, json!({ "status": "success", "blocked": 1 }));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
    assert_eq!(transcript[4], Message::assistant("done, blocked it 🚫"));

    assert_eq!(engine.tool_state().await, json!({ "blocked": 1 }));
    assert_eq!(engine.status(), ChatStatus::Idle);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.as_ref().map(|t| t.len()), Some(2));
    assert_eq!(requests[0].messages[0], ChatMessage::system("You are Nudge."));
    assert_eq!(requests[1].messages.len(), 4);
    assert_tool_results_paired(&requests[1].messages);

    let visible = engine.visible_messages().await;
    assert_eq!(
        visible,
        vec![
            Message::user("block instagram now"),
            Message::assistant("done, blocked it 🚫"),
        ]
    );
}

#[tokio::test]
async fn test_whitespace_input_is_rejected() {
    let gateway = ScriptedGateway::new(vec![reply("unused")]);
    let engine = engine(&gateway);

    assert_eq!(engine.submit("   \n\t").await, Err(NudgeError::EmptyInput));
    assert_eq!(engine.transcript().await.len(), 1);
    assert!(gateway.requests().is_empty());
    assert_eq!(engine.status(), ChatStatus::Idle);
}

#[tokio::test]
async fn test_upstream_error_leaves_user_message() {
    let gateway = ScriptedGateway::new(vec![Err(NudgeError::Upstream {
        status: 500,
        message: "Upstream request failed".to_string(),
    })]);
    let engine = engine(&gateway);

    let err = engine.submit("hello").await.unwrap_err();
    assert!(err.is_request_failure());

    let transcript = engine.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], Message::user("hello"));
    assert_eq!(
        engine.status(),
        ChatStatus::Failed("Request failed: Upstream request failed".to_string())
    );
}

#[tokio::test]
async fn test_tool_loop_limit_is_reported() {
    let gateway = ScriptedGateway::new(vec![
        tool_calls(&[("call_1", "get_status", "{}")]),
        tool_calls(&[("call_2", "get_status", "{}")]),
        tool_calls(&[("call_3", "get_status", "{}")]),
    ]);
    let config = EngineConfig::builder().access_token("t").max_tool_rounds(2).build();
    let engine = ConversationEngine::new(config, gateway.clone(), StatusToolExecutor::new());

    assert_eq!(
        engine.submit("status?").await,
        Err(NudgeError::ToolLoopLimit(2))
    );
    assert_eq!(gateway.requests().len(), 3);

    // Two complete rounds; the third request's calls were never appended.
    let transcript = engine.transcript().await;
    assert_eq!(transcript.len(), 6);
    assert!(matches!(engine.status(), ChatStatus::Failed(_)));
    assert!(!transcript
        .iter()
        .any(|m| matches!(m, Message::Assistant { tool_calls, .. } if tool_calls.iter().any(|c| c.id == "call_3"))));
}

#[tokio::test]
async fn test_multiple_calls_run_in_order() {
    let gateway = ScriptedGateway::new(vec![
        tool_calls(&[
            ("a", "get_status", "{}"),
            ("b", "set_status", r#"{"blocked":1}"#),
            ("c", "get_status", "{}"),
            ("d", "set_status", r#"{"blocked":7}"#),
        ]),
        reply("Blocked."),
    ]);
    let engine = engine(&gateway);
    engine.submit("check then block").await.unwrap();

    let transcript = engine.transcript().await;
    let results: Vec<(&str, &str)> = transcript
        .iter()
        .filter_map(|m| match m {
            Message::Tool {
                tool_call_id,
                content,
            } => Some((tool_call_id.as_str(), content.as_str())),
            _ => None,
        })
        .collect();

    assert_eq!(results.len(), 4);
    assert_eq!(results[0], ("a", r#"{"blocked":0}"#));
    assert_eq!(results[1].0, "b");
    assert_eq!(results[2], ("c", r#"{"blocked":1}"#));
    assert_eq!(results[3].0, "d");
    assert!(results[3].1.contains("\"error\""));
    assert_eq!(engine.tool_state().await, json!({ "blocked": 1 }));
}

/// Holds the first request until released.
struct BlockingGateway {
    release: Arc<Notify>,
}

#[async_trait]
impl ModelGateway for BlockingGateway {
    async fn complete(
        &self,
        _request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NudgeError> {
        self.release.notified().await;
        reply("finally")
    }
}

#[tokio::test]
async fn test_concurrent_submit_is_busy() {
    let release = Arc::new(Notify::new());
    let engine = ConversationEngine::new(
        config(),
        BlockingGateway {
            release: release.clone(),
        },
        StatusToolExecutor::new(),
    );
    let mut status = engine.subscribe();

    let (first, second) = tokio::join!(engine.submit("first"), async {
        status
            .wait_for(|s| *s == ChatStatus::Waiting)
            .await
            .unwrap();
        // The transcript stays readable while the gateway call is pending.
        assert_eq!(engine.visible_messages().await, vec![Message::user("first")]);
        let second = engine.submit("second").await;
        release.notify_one();
        second
    });

    assert_eq!(first.unwrap(), "finally");
    assert_eq!(second, Err(NudgeError::Busy));
    assert_eq!(engine.transcript().await.len(), 3);
}

#[tokio::test]
async fn test_persist_and_resume() {
    init_tracing();
    let store = Arc::new(MemoryTranscriptStore::new());
    let gateway = ScriptedGateway::new(vec![
        tool_calls(&[("call_1", "set_status", r#"{"blocked":1}"#)]),
        reply("done, blocked it 🚫"),
    ]);
    let engine = engine(&gateway).with_store(store.clone());
    engine.submit("block instagram now").await.unwrap();

    let id = engine.conversation_id().await.unwrap();
    let rows = store.get_messages(&id).await.unwrap();
    let orders: Vec<i64> = rows.iter().map(|r| r.sequence_order).collect();
    let roles: Vec<&str> = rows.iter().map(|r| r.role.as_str()).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);
    assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);
    assert_eq!(rows[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(
        store.get_conversation(&id).await.unwrap().metadata,
        json!({ "blocked": 1 })
    );

    // A fresh engine picks up transcript, flag and numbering.
    let gateway = ScriptedGateway::new(vec![reply("It's blocked.")]);
    let resumed = engine_with_greeting(&gateway).with_store(store.clone());
    assert_eq!(resumed.resume(&id).await.unwrap(), 4);
    assert_eq!(resumed.tool_state().await, json!({ "blocked": 1 }));

    let visible = resumed.visible_messages().await;
    assert_eq!(visible.len(), 3);
    assert_eq!(visible[0], Message::assistant("Welcome back"));

    resumed.submit("is it blocked?").await.unwrap();
    let request = &gateway.requests()[0];
    assert_eq!(request.messages.len(), 7);
    assert_tool_results_paired(&request.messages);

    let orders: Vec<i64> = store
        .get_messages(&id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.sequence_order)
        .collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
}

fn engine_with_greeting(gateway: &Arc<ScriptedGateway>) -> ConversationEngine<Arc<ScriptedGateway>> {
    let config = EngineConfig::builder()
        .access_token("t")
        .system_prompt("You are Nudge.")
        .greeting("Welcome back")
        .build();
    ConversationEngine::new(config, gateway.clone(), StatusToolExecutor::new())
}

#[tokio::test]
async fn test_resume_sanitizes_stored_transcript() {
    let store = Arc::new(MemoryTranscriptStore::new());
    let id = store.create_conversation().await.unwrap();

    let rows = vec![
        NewMessage::from_message(&Message::user("block it"), 0).unwrap(),
        NewMessage::from_message(
            &Message::assistant_tool_calls(
                None,
                vec![ToolCall::new("call_lost", "set_status", r#"{"blocked":1}"#)],
            ),
            1,
        )
        .unwrap(),
        NewMessage::from_message(&Message::tool("ghost", "{}"), 2).unwrap(),
        NewMessage::from_message(&Message::user("hello?"), 3).unwrap(),
    ];
    for row in rows {
        store.save_message(&id, row).await.unwrap();
    }

    let gateway = ScriptedGateway::new(vec![reply("Hi!")]);
    let engine = engine(&gateway).with_store(store.clone());
    engine.resume(&id).await.unwrap();
    engine.submit("anyone?").await.unwrap();

    let request = &gateway.requests()[0];
    assert_eq!(
        request.messages,
        vec![
            ChatMessage::system("You are Nudge."),
            ChatMessage::user("block it"),
            ChatMessage::user("hello?"),
            ChatMessage::user("anyone?"),
        ]
    );

    let last = store.get_messages(&id).await.unwrap();
    assert_eq!(last.last().map(|r| r.sequence_order), Some(5));
}

/// Store where every call fails.
struct BrokenStore;

#[async_trait]
impl TranscriptStore for BrokenStore {
    async fn create_conversation(&self) -> Result<String, NudgeError> {
        Err(NudgeError::Storage("disk full".to_string()))
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationInfo>, NudgeError> {
        Err(NudgeError::Storage("disk full".to_string()))
    }

    async fn get_conversation(&self, id: &str) -> Result<ConversationInfo, NudgeError> {
        Err(NudgeError::ConversationNotFound(id.to_string()))
    }

    async fn get_messages(&self, id: &str) -> Result<Vec<StoredMessage>, NudgeError> {
        Err(NudgeError::ConversationNotFound(id.to_string()))
    }

    async fn save_message(
        &self,
        _id: &str,
        _message: NewMessage,
    ) -> Result<StoredMessage, NudgeError> {
        Err(NudgeError::Storage("disk full".to_string()))
    }

    async fn update_metadata(&self, _id: &str, _metadata: Value) -> Result<(), NudgeError> {
        Err(NudgeError::Storage("disk full".to_string()))
    }

    async fn delete_conversation(&self, _id: &str) -> Result<(), NudgeError> {
        Err(NudgeError::Storage("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_store_failures_are_swallowed() {
    let gateway = ScriptedGateway::new(vec![
        tool_calls(&[("call_1", "set_status", r#"{"blocked":1}"#)]),
        reply("Done."),
    ]);
    let engine = engine(&gateway).with_store(Arc::new(BrokenStore));

    assert_eq!(engine.submit("block").await.unwrap(), "Done.");
    assert!(engine.conversation_id().await.is_none());
    assert_eq!(engine.transcript().await.len(), 5);

    assert!(matches!(
        engine.resume("missing").await,
        Err(NudgeError::ConversationNotFound(_))
    ));
}

/// In-memory store that fails one `save_message` call.
///
/// With `commit` set the failing row is still written, as when the server
/// commits but the response never arrives.
struct FaultyStore {
    inner: MemoryTranscriptStore,
    fail_on_save: usize,
    commit: bool,
    saves: AtomicUsize,
}

impl FaultyStore {
    fn new(fail_on_save: usize, commit: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTranscriptStore::new(),
            fail_on_save,
            commit,
            saves: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TranscriptStore for FaultyStore {
    async fn create_conversation(&self) -> Result<String, NudgeError> {
        self.inner.create_conversation().await
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationInfo>, NudgeError> {
        self.inner.get_conversations().await
    }

    async fn get_conversation(&self, id: &str) -> Result<ConversationInfo, NudgeError> {
        self.inner.get_conversation(id).await
    }

    async fn get_messages(&self, id: &str) -> Result<Vec<StoredMessage>, NudgeError> {
        self.inner.get_messages(id).await
    }

    async fn save_message(
        &self,
        id: &str,
        message: NewMessage,
    ) -> Result<StoredMessage, NudgeError> {
        let call = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if call != self.fail_on_save {
            return self.inner.save_message(id, message).await;
        }
        if self.commit {
            self.inner.save_message(id, message).await?;
        }
        Err(NudgeError::Storage("operation timed out".to_string()))
    }

    async fn update_metadata(&self, id: &str, metadata: Value) -> Result<(), NudgeError> {
        self.inner.update_metadata(id, metadata).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), NudgeError> {
        self.inner.delete_conversation(id).await
    }
}

async fn stored_rows(store: &FaultyStore, id: &str) -> Vec<(i64, String, Option<String>)> {
    store
        .get_messages(id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.sequence_order, r.role, r.content))
        .collect()
}

#[tokio::test]
async fn test_lost_save_response_does_not_stop_persistence() {
    init_tracing();
    let store = FaultyStore::new(1, true);
    let gateway = ScriptedGateway::new(vec![reply("one"), reply("two"), reply("three")]);
    let engine = engine(&gateway).with_store(store.clone());

    for text in ["first", "second", "third"] {
        engine.submit(text).await.unwrap();
    }
    assert_eq!(engine.transcript().await.len(), 7);

    let id = engine.conversation_id().await.unwrap();
    let rows = stored_rows(&store, &id).await;
    let orders: Vec<i64> = rows.iter().map(|r| r.0).collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(rows[0].2.as_deref(), Some("first"));
    assert_eq!(rows[1].2.as_deref(), Some("one"));
    assert_eq!(rows[5].2.as_deref(), Some("three"));
}

#[tokio::test]
async fn test_failed_save_mid_tool_step_keeps_order_contiguous() {
    init_tracing();
    // Saves: user, assistant step, tool result (fails), final reply.
    let store = FaultyStore::new(3, false);
    let gateway = ScriptedGateway::new(vec![
        tool_calls(&[("call_1", "set_status", r#"{"blocked":1}"#)]),
        reply("Blocked."),
    ]);
    let engine = engine(&gateway).with_store(store.clone());

    assert_eq!(engine.submit("block it").await.unwrap(), "Blocked.");

    // In memory the call is still paired with its result.
    let transcript = engine.transcript().await;
    assert!(transcript[2].is_tool_step());
    assert!(matches!(
        &transcript[3],
        Message::Tool { tool_call_id, .. } if tool_call_id == "call_1"
    ));
    assert_tool_results_paired(&gateway.requests()[1].messages);

    let id = engine.conversation_id().await.unwrap();
    let rows = stored_rows(&store, &id).await;
    let orders: Vec<i64> = rows.iter().map(|r| r.0).collect();
    let roles: Vec<&str> = rows.iter().map(|r| r.1.as_str()).collect();
    assert_eq!(orders, vec![0, 1, 2]);
    assert_eq!(roles, vec!["user", "assistant", "assistant"]);
    assert_eq!(rows[2].2.as_deref(), Some("Blocked."));
    assert_eq!(
        store.get_conversation(&id).await.unwrap().metadata,
        json!({ "blocked": 1 })
    );
}
