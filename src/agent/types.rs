use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolResult;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolObservation
}

/// A tool invocation proposed by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id linking the call to its observation
    pub id:        String,
    pub name:      String,
    pub arguments: Value
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id:   id.into(),
            name: name.into(),
            arguments
        }
    }
}

/// One entry of the transcript.
///
/// Assistant turns that request a tool carry the call; observation turns
/// carry the call they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role:      Role,
    pub content:   String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role:      Role::User,
            content:   content.into(),
            tool_call: None
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role:      Role::Assistant,
            content:   content.into(),
            tool_call: None
        }
    }

    pub fn tool_request(call: ToolCall) -> Self {
        Self {
            role:      Role::Assistant,
            content:   String::new(),
            tool_call: Some(call)
        }
    }

    pub fn observation(call: ToolCall, content: impl Into<String>) -> Self {
        Self {
            role:      Role::ToolObservation,
            content:   content.into(),
            tool_call: Some(call)
        }
    }

    /// Plain user or assistant text, as kept from prior turns
    pub fn is_dialogue(&self) -> bool {
        self.tool_call.is_none() && matches!(self.role, Role::User | Role::Assistant)
    }
}

/// Policy preamble plus the ordered turns sent to the model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    pub system: String,
    pub turns:  Vec<ConversationTurn>
}

/// The model's next move
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ToolCall(ToolCall),
    FinalAnswer { text: String }
}

impl Action {
    pub fn final_answer(text: impl Into<String>) -> Self {
        Self::FinalAnswer {
            text: text.into()
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall(ToolCall::new(String::new(), name, arguments))
    }
}

/// Agent loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    AwaitingModel,
    ExecutingTool,
    Done,
    Failed
}

/// One iteration: what the model proposed and, for tool calls that ran,
/// what the tool returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>
}

/// Terminal failure of a turn
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnFailure {
    #[error("model call failed: {0}")]
    ModelCallFailure(String),
    #[error("iteration ceiling of {0} reached")]
    LoopBudgetExceeded(usize)
}

impl TurnFailure {
    /// Caller-visible text; the raw error is never shown
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ModelCallFailure(_) => {
                "Sorry, I ran into a problem while working on your request. Please try again in \
                 a moment."
            }
            Self::LoopBudgetExceeded(_) => {
                "I could not complete the request within the allowed number of steps. Please try \
                 rephrasing or narrowing your question."
            }
        }
    }
}

/// Everything a turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer:     String,
    pub state:      LoopState,
    pub steps:      Vec<AgentStep>,
    pub transcript: Transcript,
    pub failure:    Option<TurnFailure>
}

impl TurnOutcome {
    pub fn is_done(&self) -> bool {
        self.state == LoopState::Done
    }

    /// Tool invocations that actually ran
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolResult> {
        self.steps.iter().filter_map(|s| s.result.as_ref())
    }
}
