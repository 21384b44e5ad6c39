//! Conversion between the transcript and the chat-completion wire format.

use std::collections::HashSet;

use nudge_core::{Message, NudgeError, ToolCall, ToolDefinition};
use tracing::{debug, warn};

use crate::api_types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, WireTool, WireToolCall,
};

/// Text used when the model returns neither content nor tool calls.
pub const EMPTY_REPLY_FALLBACK: &str = "I apologize, but I couldn't generate a response.";

/// What the gateway asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReply {
    /// Run these tools, in order, then call the gateway again.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Final assistant text.
    Reply(String),
}

/// Encode a transcript for the gateway.
///
/// Structural repairs applied on the way out:
/// - a `tool` message is sent only if its id was issued by an earlier,
///   not yet answered assistant tool call; anything else is dropped
/// - assistant tool calls that never got a result are stripped
/// - an assistant message with neither text nor tool calls is dropped
pub fn encode_transcript(messages: &[Message]) -> Vec<ChatMessage> {
    let answered = answered_call_ids(messages);
    let mut pending: HashSet<&str> = HashSet::new();
    let mut encoded = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::System { content } => encoded.push(ChatMessage::system(content.clone())),
            Message::User { content } => encoded.push(ChatMessage::user(content.clone())),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let kept: Vec<WireToolCall> = tool_calls
                    .iter()
                    .filter(|call| answered.contains(call.id.as_str()))
                    .map(|call| WireToolCall::function(&call.id, &call.name, &call.arguments))
                    .collect();

                if kept.len() < tool_calls.len() {
                    warn!(
                        "Dropping {} unanswered tool call(s) from transcript",
                        tool_calls.len() - kept.len()
                    );
                }

                let has_text = content.as_deref().is_some_and(|c| !c.is_empty());
                if kept.is_empty() && !has_text {
                    continue;
                }

                for call in tool_calls
                    .iter()
                    .filter(|c| answered.contains(c.id.as_str()))
                {
                    pending.insert(call.id.as_str());
                }
                encoded.push(ChatMessage::Assistant {
                    content: content.clone(),
                    tool_calls: kept,
                });
            }
            Message::Tool {
                content,
                tool_call_id,
            } => {
                if tool_call_id.is_empty() || !pending.remove(tool_call_id.as_str()) {
                    warn!("Dropping orphaned tool message (tool_call_id='{}')", tool_call_id);
                    continue;
                }
                encoded.push(ChatMessage::Tool {
                    content: content.clone(),
                    tool_call_id: tool_call_id.clone(),
                });
            }
        }
    }

    encoded
}

/// Ids of assistant tool calls that are followed by a matching tool result.
fn answered_call_ids(messages: &[Message]) -> HashSet<&str> {
    let mut issued: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();

    for message in messages {
        match message {
            Message::Assistant { tool_calls, .. } => {
                for call in tool_calls.iter().filter(|c| !c.id.is_empty()) {
                    issued.insert(call.id.as_str());
                }
            }
            Message::Tool { tool_call_id, .. } => {
                if issued.remove(tool_call_id.as_str()) {
                    answered.insert(tool_call_id.as_str());
                }
            }
            _ => {}
        }
    }

    answered
}

/// Encode tool definitions; `None` when there are none to advertise.
pub fn encode_tools(definitions: &[ToolDefinition]) -> Option<Vec<WireTool>> {
    if definitions.is_empty() {
        return None;
    }
    Some(definitions.iter().cloned().map(WireTool::from).collect())
}

/// Build a full chat completion request.
pub fn build_request(
    model: &str,
    temperature: f32,
    transcript: &[Message],
    definitions: &[ToolDefinition],
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: encode_transcript(transcript),
        temperature,
        tools: encode_tools(definitions),
    }
}

/// Interpret a gateway response.
///
/// A non-empty `tool_calls` array wins over everything else; a legacy
/// `function_call` becomes a single tool call with a synthesized id;
/// otherwise the content is the reply.
pub fn decode_response(response: ChatCompletionResponse) -> Result<GatewayReply, NudgeError> {
    if let Some(usage) = &response.usage {
        debug!(
            "Token usage - prompt: {}, completion: {}, total: {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| NudgeError::MalformedResponse("response has no choices".to_string()))?;
    let message = choice.message;

    let wire_calls = message.tool_calls.unwrap_or_default();
    if !wire_calls.is_empty() {
        let calls = wire_calls
            .into_iter()
            .map(|call| {
                let id = if call.id.is_empty() {
                    synthesize_call_id()
                } else {
                    call.id
                };
                ToolCall::new(id, call.function.name, call.function.arguments)
            })
            .collect();
        return Ok(GatewayReply::ToolCalls {
            content: message.content,
            calls,
        });
    }

    if let Some(function) = message.function_call {
        return Ok(GatewayReply::ToolCalls {
            content: message.content,
            calls: vec![ToolCall::new(
                synthesize_call_id(),
                function.name,
                function.arguments,
            )],
        });
    }

    match message.content {
        Some(text) if !text.trim().is_empty() => Ok(GatewayReply::Reply(text)),
        _ => {
            warn!("No content in response, using default");
            Ok(GatewayReply::Reply(EMPTY_REPLY_FALLBACK.to_string()))
        }
    }
}

fn synthesize_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
