//! Anthropic messages API wire format.
//!
//! Tool requests travel as `tool_use` blocks on assistant messages and
//! observations as `tool_result` blocks on user messages. The API requires
//! roles to alternate, so consecutive messages of one role are merged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GenerationSettings;
use crate::{
    agent::{Action, Role, ToolCall, Transcript},
    error::AppResult,
    tools::ToolSpec
};

#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model:       String,
    pub max_tokens:  u32,
    pub system:      String,
    pub messages:    Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools:       Vec<ToolDef>,
    pub temperature: f32
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub role:    &'static str,
    pub content: Vec<ContentBlock>
}

#[derive(Debug, Serialize)]
pub struct ToolDef {
    pub name:         String,
    pub description:  String,
    pub input_schema: Value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String
    },
    ToolUse {
        id:    String,
        name:  String,
        input: Value
    },
    ToolResult {
        tool_use_id: String,
        content:     String
    },
    #[serde(other)]
    Unknown
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>
}

pub fn build_request(
    model: &str,
    settings: GenerationSettings,
    transcript: &Transcript,
    tools: &[ToolSpec]
) -> MessagesRequest {
    let mut messages: Vec<Message> = Vec::with_capacity(transcript.turns.len());
    for turn in &transcript.turns {
        let (role, blocks) = match (turn.role, &turn.tool_call) {
            (Role::User, _) => ("user", text_block(&turn.content)),
            (Role::Assistant, None) => ("assistant", text_block(&turn.content)),
            (Role::Assistant, Some(call)) => {
                let mut blocks = text_block(&turn.content);
                blocks.push(ContentBlock::ToolUse {
                    id:    call.id.clone(),
                    name:  call.name.clone(),
                    input: input_object(&call.arguments)
                });
                ("assistant", blocks)
            }
            (Role::ToolObservation, call) => (
                "user",
                vec![ContentBlock::ToolResult {
                    tool_use_id: call.as_ref().map(|c| c.id.clone()).unwrap_or_default(),
                    content:     turn.content.clone()
                }]
            )
        };
        if blocks.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(Message {
                role,
                content: blocks
            })
        }
    }
    MessagesRequest {
        model: model.to_string(),
        max_tokens: settings.max_tokens,
        system: transcript.system.clone(),
        messages,
        tools: tools
            .iter()
            .map(|spec| ToolDef {
                name:         spec.name.clone(),
                description:  spec.description.clone(),
                input_schema: spec.input_schema.clone()
            })
            .collect(),
        temperature: settings.temperature
    }
}

pub fn parse_response(response: MessagesResponse) -> AppResult<Action> {
    let mut text = String::new();
    for block in response.content {
        match block {
            ContentBlock::ToolUse {
                id,
                name,
                input
            } => return Ok(Action::ToolCall(ToolCall::new(id, name, input))),
            ContentBlock::Text {
                text: part
            } => text.push_str(&part),
            _ => {}
        }
    }
    Ok(Action::final_answer(text))
}

fn text_block(content: &str) -> Vec<ContentBlock> {
    if content.is_empty() {
        return Vec::new();
    }
    vec![ContentBlock::Text {
        text: content.to_string()
    }]
}

fn input_object(arguments: &Value) -> Value {
    match arguments {
        Value::Object(_) => arguments.clone(),
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| serde_json::json!({ "input": raw })),
        other => serde_json::json!({ "input": other })
    }
}
