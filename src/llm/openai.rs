//! OpenAI chat completions wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerationSettings, parse_arguments};
use crate::{
    agent::{Action, Role, ToolCall, Transcript},
    error::{AppResult, llm_api_error},
    tools::ToolSpec
};

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model:               String,
    pub messages:            Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools:               Vec<FunctionTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    pub temperature:         f32,
    pub max_tokens:          u32
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub role:         &'static str,
    pub content:      Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls:   Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>
}

/// Tool declaration shared with Ollama
#[derive(Debug, Serialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind:     &'static str,
    pub function: FunctionDef
}

#[derive(Debug, Serialize)]
pub struct FunctionDef {
    pub name:        String,
    pub description: String,
    pub parameters:  Value
}

impl From<&ToolSpec> for FunctionTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind:     "function",
            function: FunctionDef {
                name:        spec.name.clone(),
                description: spec.description.clone(),
                parameters:  spec.input_schema.clone()
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id:       String,
    #[serde(rename = "type", default)]
    pub kind:     String,
    pub function: WireFunction
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireFunction {
    pub name:      String,
    /// JSON-encoded arguments object
    #[serde(default)]
    pub arguments: String
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content:    Option<String>,
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
        role:         "system",
        content:      Some(transcript.system.clone()),
        tool_calls:   None,
        tool_call_id: None
    });
    for turn in &transcript.turns {
        let message = match (turn.role, &turn.tool_call) {
            (Role::Assistant, Some(call)) => Message {
                role:         "assistant",
                content:      (!turn.content.is_empty()).then(|| turn.content.clone()),
                tool_calls:   Some(vec![WireToolCall {
                    id:       call.id.clone(),
                    kind:     String::from("function"),
                    function: WireFunction {
                        name:      call.name.clone(),
                        arguments: encode_arguments(&call.arguments)
                    }
                }]),
                tool_call_id: None
            },
            (Role::ToolObservation, call) => Message {
                role:         "tool",
                content:      Some(turn.content.clone()),
                tool_calls:   None,
                tool_call_id: call.as_ref().map(|c| c.id.clone())
            },
            (Role::User, _) => Message {
                role:         "user",
                content:      Some(turn.content.clone()),
                tool_calls:   None,
                tool_call_id: None
            },
            (Role::Assistant, None) => Message {
                role:         "assistant",
                content:      Some(turn.content.clone()),
                tool_calls:   None,
                tool_call_id: None
            }
        };
        messages.push(message);
    }
    ChatRequest {
        model: model.to_string(),
        messages,
        tools: tools.iter().map(FunctionTool::from).collect(),
        parallel_tool_calls: (!tools.is_empty()).then_some(false),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens
    }
}

pub fn parse_response(response: ChatResponse) -> AppResult<Action> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| llm_api_error("No response from OpenAI"))?;
    if let Some(call) = message.tool_calls.into_iter().next() {
        return Ok(Action::ToolCall(ToolCall::new(
            call.id,
            call.function.name,
            parse_arguments(&call.function.arguments)
        )));
    }
    Ok(Action::final_answer(message.content.unwrap_or_default()))
}

fn encode_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string()
    }
}
