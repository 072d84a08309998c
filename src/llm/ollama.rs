//! Ollama `/api/chat` wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerationSettings, openai::FunctionTool, parse_arguments};
use crate::{
    agent::{Action, Role, ToolCall, Transcript},
    error::AppResult,
    tools::ToolSpec
};

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model:    String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools:    Vec<FunctionTool>,
    pub stream:   bool,
    pub options:  Options
}

#[derive(Debug, Serialize)]
pub struct Options {
    pub temperature: f32,
    pub num_predict: u32
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub role:       &'static str,
    pub content:    String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name:  Option<String>
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCall {
    pub function: WireFunction
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireFunction {
    pub name:      String,
    #[serde(default)]
    pub arguments: Value
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content:    String,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>
}

pub fn build_request(
    model: &str,
    settings: GenerationSettings,
    transcript: &Transcript,
    tools: &[ToolSpec]
) -> ChatRequest {
    let mut messages = Vec::with_capacity(transcript.turns.len() + 1);
    messages.push(Message {
        role:       "system",
        content:    transcript.system.clone(),
        tool_calls: None,
        tool_name:  None
    });
    for turn in &transcript.turns {
        let (role, tool_calls, tool_name) = match (turn.role, &turn.tool_call) {
            (Role::User, _) => ("user", None, None),
            (Role::Assistant, None) => ("assistant", None, None),
            (Role::Assistant, Some(call)) => (
                "assistant",
                Some(vec![WireToolCall {
                    function: WireFunction {
                        name:      call.name.clone(),
                        arguments: call.arguments.clone()
                    }
                }]),
                None
            ),
            (Role::ToolObservation, call) => ("tool", None, call.as_ref().map(|c| c.name.clone()))
        };
        messages.push(Message {
            role,
            content: turn.content.clone(),
            tool_calls,
            tool_name
        });
    }
    ChatRequest {
        model: model.to_string(),
        messages,
        tools: tools.iter().map(FunctionTool::from).collect(),
        stream: false,
        options: Options {
            temperature: settings.temperature,
            num_predict: settings.max_tokens
        }
    }
}

/// Ollama assigns no call ids, so one is derived from the transcript length
pub fn parse_response(response: ChatResponse, transcript: &Transcript) -> AppResult<Action> {
    let message = response.message;
    if let Some(call) = message.tool_calls.into_iter().next() {
        let arguments = match call.function.arguments {
            Value::String(raw) => parse_arguments(&raw),
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other
        };
        return Ok(Action::ToolCall(ToolCall::new(
            format!("ollama_call_{}", transcript.turns.len()),
            call.function.name,
            arguments
        )));
    }
    Ok(Action::final_answer(message.content))
}
