//! The conversation engine: transcript building and the gateway loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nudge_core::{
    hash_prompt, Message, NewMessage, NudgeError, StoredMessage, ToolCall, ToolExecutor,
    TranscriptStore,
};
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::gateway::ModelGateway;
use crate::wire::{build_request, decode_response, GatewayReply};

/// Request state shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatStatus {
    #[default]
    Idle,
    /// A submission is waiting on the gateway.
    Waiting,
    /// The last submission failed; carries the user-facing message.
    Failed(String),
}

struct EngineState {
    transcript: Vec<Message>,
    tools: Box<dyn ToolExecutor>,
    conversation_id: Option<String>,
    next_sequence: i64,
    /// Set after a failed save. Numbering is re-read from the store first.
    resync_sequence: bool,
}

/// Marks the engine busy until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, NudgeError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| NudgeError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one conversation against a [`ModelGateway`].
///
/// The transcript always starts with the system message (and the greeting,
/// when configured). Neither is persisted. Everything appended after that is
/// written to the store, if one is attached, in transcript order.
///
/// Only one submission or resume runs at a time. The state lock is never
/// held across a gateway or store call, so readers see the transcript grow
/// while a submission is in flight.
pub struct ConversationEngine<G> {
    config: EngineConfig,
    gateway: G,
    store: Option<Arc<dyn TranscriptStore>>,
    state: Mutex<EngineState>,
    in_flight: AtomicBool,
    status: watch::Sender<ChatStatus>,
    system_prompt_hash: String,
}

impl<G: ModelGateway> ConversationEngine<G> {
    /// Create an engine with a fresh transcript.
    pub fn new(config: EngineConfig, gateway: G, tools: impl ToolExecutor + 'static) -> Self {
        let system_prompt_hash = hash_prompt(&config.system_prompt);
        info!("System prompt fingerprint: {}", system_prompt_hash);
        info!(
            "ConversationEngine initialized with model: {}, max_tool_rounds: {}, tools: [{}]",
            config.model,
            config.max_tool_rounds,
            tools.supported_tools().join(", ")
        );

        let (status, _) = watch::channel(ChatStatus::Idle);
        let state = EngineState {
            transcript: base_transcript(&config),
            tools: Box::new(tools),
            conversation_id: None,
            next_sequence: 0,
            resync_sequence: false,
        };

        Self {
            config,
            gateway,
            store: None,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
            status,
            system_prompt_hash,
        }
    }

    /// Attach a transcript store. Without one the engine works in memory only.
    pub fn with_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// SHA-256 fingerprint of the system prompt.
    pub fn system_prompt_hash(&self) -> &str {
        &self.system_prompt_hash
    }

    /// Current request state.
    pub fn status(&self) -> ChatStatus {
        self.status.borrow().clone()
    }

    /// Watch request state changes.
    pub fn subscribe(&self) -> watch::Receiver<ChatStatus> {
        self.status.subscribe()
    }

    /// Full transcript, including internal protocol messages.
    pub async fn transcript(&self) -> Vec<Message> {
        self.state.lock().await.transcript.clone()
    }

    /// Messages a user should see: user turns and final assistant replies.
    pub async fn visible_messages(&self) -> Vec<Message> {
        self.state
            .lock()
            .await
            .transcript
            .iter()
            .filter(|m| m.is_visible())
            .cloned()
            .collect()
    }

    /// Id of the backing conversation, once one exists.
    pub async fn conversation_id(&self) -> Option<String> {
        self.state.lock().await.conversation_id.clone()
    }

    /// Snapshot of the tool executor's state.
    pub async fn tool_state(&self) -> Value {
        self.state.lock().await.tools.snapshot()
    }

    /// Load a stored conversation into this engine.
    ///
    /// Tool state comes from the conversation metadata. Rows that cannot be
    /// turned back into messages are skipped; numbering continues after the
    /// highest stored `sequence_order`.
    pub async fn resume(&self, conversation_id: &str) -> Result<usize, NudgeError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| NudgeError::Configuration("no transcript store attached".to_string()))?;
        let _guard = InFlight::acquire(&self.in_flight)?;

        let info = store.get_conversation(conversation_id).await?;
        let mut rows = store.get_messages(conversation_id).await?;
        rows.sort_by_key(|row| row.sequence_order);

        let mut transcript = base_transcript(&self.config);
        let mut restored = 0;
        for row in &rows {
            match row.to_message() {
                Ok(message) => {
                    transcript.push(message);
                    restored += 1;
                }
                Err(reason) => warn!(
                    "Skipping stored message {} in {}: {}",
                    row.sequence_order, conversation_id, reason
                ),
            }
        }

        {
            let mut state = self.state.lock().await;
            state.tools.restore(&info.metadata);
            state.transcript = transcript;
            state.conversation_id = Some(conversation_id.to_string());
            state.next_sequence = next_sequence_after(&rows);
            state.resync_sequence = false;
        }

        info!(
            "Resumed conversation {} ({} of {} messages)",
            conversation_id,
            restored,
            rows.len()
        );
        self.status.send_replace(ChatStatus::Idle);
        Ok(restored)
    }

    /// Submit user text and run the gateway loop until a plain reply.
    ///
    /// Whitespace-only input is rejected without touching the transcript.
    /// A second call while one is in flight fails with [`NudgeError::Busy`].
    pub async fn submit(&self, text: &str) -> Result<String, NudgeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NudgeError::EmptyInput);
        }

        let _guard = InFlight::acquire(&self.in_flight)?;
        self.status.send_replace(ChatStatus::Waiting);

        let result = self.run(text).await;
        match &result {
            Ok(_) => {
                self.status.send_replace(ChatStatus::Idle);
            }
            Err(err) => {
                warn!("Submission failed: {}", err);
                self.status.send_replace(ChatStatus::Failed(err.user_message()));
            }
        }
        result
    }

    async fn run(&self, text: &str) -> Result<String, NudgeError> {
        self.ensure_conversation().await;
        self.append(Message::user(text)).await;

        let definitions = self.state.lock().await.tools.definitions();
        let max_rounds = self.config.max_tool_rounds;

        for round in 0..=max_rounds {
            let request = {
                let state = self.state.lock().await;
                build_request(
                    &self.config.model,
                    self.config.temperature,
                    &state.transcript,
                    &definitions,
                )
            };
            let response = self.gateway.complete(&request).await?;

            match decode_response(response)? {
                GatewayReply::Reply(reply) => {
                    self.append(Message::assistant(reply.clone())).await;
                    return Ok(reply);
                }
                GatewayReply::ToolCalls { content, calls } => {
                    if round == max_rounds {
                        warn!(
                            "Model still requesting tools after {} round(s), giving up",
                            max_rounds
                        );
                        break;
                    }
                    debug!("Tool round {}: {} call(s)", round + 1, calls.len());
                    self.run_tool_step(content, calls).await;
                }
            }
        }

        Err(NudgeError::ToolLoopLimit(max_rounds))
    }

    /// Append the assistant tool step and one result per call, in order.
    ///
    /// The step and its results enter the transcript together; saving
    /// happens afterwards.
    async fn run_tool_step(&self, content: Option<String>, calls: Vec<ToolCall>) {
        let (appended, before, after) = {
            let mut state = self.state.lock().await;
            let before = state.tools.snapshot();

            let mut appended = Vec::with_capacity(calls.len() + 1);
            appended.push(Message::assistant_tool_calls(content, calls.clone()));
            for call in &calls {
                info!("Executing tool {} ({})", call.name, call.id);
                let result = state.tools.execute(call);
                if !result.success {
                    debug!("Tool {} returned error result: {}", call.name, result.content);
                }
                appended.push(Message::tool(result.tool_call_id, result.content));
            }

            state.transcript.extend(appended.iter().cloned());
            let after = state.tools.snapshot();
            (appended, before, after)
        };

        for message in &appended {
            self.persist(message).await;
        }
        if after != before {
            self.persist_tool_state(after).await;
        }
    }

    /// Create the backing conversation on first use.
    async fn ensure_conversation(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if self.state.lock().await.conversation_id.is_some() {
            return;
        }

        match store.create_conversation().await {
            Ok(id) => {
                info!("Created conversation {}", id);
                let mut state = self.state.lock().await;
                state.conversation_id = Some(id);
                state.next_sequence = 0;
                state.resync_sequence = false;
            }
            Err(err) => warn!("Failed to create conversation, continuing unsaved: {}", err),
        }
    }

    async fn append(&self, message: Message) {
        self.state.lock().await.transcript.push(message.clone());
        self.persist(&message).await;
    }

    /// Save one transcript entry. Failures are logged only.
    async fn persist(&self, message: &Message) {
        let Some(store) = &self.store else {
            return;
        };
        let (conversation_id, resync) = {
            let state = self.state.lock().await;
            let Some(id) = state.conversation_id.clone() else {
                return;
            };
            (id, state.resync_sequence)
        };

        if resync {
            self.resync_sequence(store.as_ref(), &conversation_id).await;
        }

        let sequence_order = self.state.lock().await.next_sequence;
        let Some(row) = NewMessage::from_message(message, sequence_order) else {
            return;
        };

        let role = row.role;
        let saved = store.save_message(&conversation_id, row).await;

        let mut state = self.state.lock().await;
        match saved {
            Ok(_) => state.next_sequence = sequence_order + 1,
            Err(err) => {
                warn!(
                    "Failed to persist {} message {} in {}: {}",
                    role, sequence_order, conversation_id, err
                );
                state.resync_sequence = true;
            }
        }
    }

    /// Continue numbering after whatever the store actually holds.
    ///
    /// A save whose response was lost may still have been committed.
    async fn resync_sequence(&self, store: &dyn TranscriptStore, conversation_id: &str) {
        match store.get_messages(conversation_id).await {
            Ok(rows) => {
                let next = next_sequence_after(&rows);
                let mut state = self.state.lock().await;
                if next != state.next_sequence {
                    info!(
                        "Sequence for {} moved from {} to {}",
                        conversation_id, state.next_sequence, next
                    );
                }
                state.next_sequence = next;
                state.resync_sequence = false;
            }
            Err(err) => warn!("Failed to re-read sequence for {}: {}", conversation_id, err),
        }
    }

    async fn persist_tool_state(&self, snapshot: Value) {
        let Some(store) = &self.store else {
            return;
        };
        let Some(conversation_id) = self.state.lock().await.conversation_id.clone() else {
            return;
        };
        if let Err(err) = store.update_metadata(&conversation_id, snapshot).await {
            warn!("Failed to persist tool state for {}: {}", conversation_id, err);
        }
    }
}

fn next_sequence_after(rows: &[StoredMessage]) -> i64 {
    rows.iter().map(|r| r.sequence_order + 1).max().unwrap_or(0)
}

fn base_transcript(config: &EngineConfig) -> Vec<Message> {
    let mut transcript = vec![Message::system(config.system_prompt.clone())];
    if let Some(greeting) = &config.greeting {
        transcript.push(Message::assistant(greeting.clone()));
    }
    transcript
}
