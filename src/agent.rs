//! Tool-calling agent loop for one conversation turn.
//!
//! ```text
//!                  tool call                 observation appended
//! AWAITING_MODEL ─────────────▶ EXECUTING_TOOL ─────────────────┐
//!      ▲  │                                                     │
//!      │  │ final answer ──▶ DONE                               │
//!      │  │ model error / ceiling ──▶ FAILED                    │
//!      └──┴─────────────────────────────────────────────────────┘
//! ```
//!
//! Each turn is seeded with the policy preamble and a bounded slice of the
//! caller's history. Model calls and tool invocations run strictly one after
//! another. Guard rejections, execution errors and unknown tools are fed
//! back as observations so the model can correct itself; only a failing
//! model call or the iteration ceiling ends a turn early. The agent keeps no
//! state between turns.

mod types;

use std::sync::Arc;

use tracing::{debug, error, info};
pub use types::{
    Action, AgentStep, ConversationTurn, LoopState, Role, ToolCall, Transcript, TurnFailure,
    TurnOutcome
};

use crate::{config::AgentConfig, llm::LanguageModel, prompt::PromptPolicy, tools::ToolRegistry};

/// Per-turn budget
#[derive(Debug, Clone, Copy)]
pub struct AgentSettings {
    /// Model calls allowed per turn; tool executions never exceed it
    pub max_iterations: usize,
    /// Prior user/assistant turns kept in the transcript
    pub history_limit:  usize
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

impl AgentSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_iterations: config.max_iterations.max(1),
            history_limit:  config.history_limit
        }
    }
}

/// Orchestrates model calls and tool dispatch for a turn
pub struct Agent {
    model:    Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    policy:   PromptPolicy,
    settings: AgentSettings
}

impl Agent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
        policy: PromptPolicy,
        settings: AgentSettings
    ) -> Self {
        Self {
            model,
            registry,
            policy,
            settings
        }
    }

    /// Answer one user message; the only text a caller ever sees
    pub async fn run_turn(&self, user_text: &str, history: &[ConversationTurn]) -> String {
        self.run_turn_detailed(user_text, history).await.answer
    }

    /// Answer one user message and keep the steps taken
    pub async fn run_turn_detailed(
        &self,
        user_text: &str,
        history: &[ConversationTurn]
    ) -> TurnOutcome {
        let tools = self.registry.list();
        let mut run = TurnRun {
            transcript: Transcript {
                system: self.policy.preamble(),
                turns:  self.seed_turns(user_text, history)
            },
            steps:      Vec::new(),
            state:      LoopState::AwaitingModel
        };
        let max_iterations = self.settings.max_iterations.max(1);

        for iteration in 1..=max_iterations {
            debug!(iteration, "awaiting model");
            let action = match self.model.generate(&run.transcript, &tools).await {
                Ok(action) => action,
                Err(err) => {
                    return run.fail(TurnFailure::ModelCallFailure(err.to_string()));
                }
            };
            match action {
                Action::FinalAnswer {
                    text
                } => {
                    if text.trim().is_empty() {
                        return run.fail(TurnFailure::ModelCallFailure(String::from(
                            "model returned an empty answer"
                        )));
                    }
                    return run.finish(text);
                }
                Action::ToolCall(mut call) => {
                    if iteration == max_iterations {
                        run.steps.push(AgentStep {
                            action: Action::ToolCall(call),
                            result: None
                        });
                        break;
                    }
                    if call.id.is_empty() {
                        call.id = format!("call_{}", iteration);
                    }
                    run.transition(LoopState::ExecutingTool);
                    run.transcript
                        .turns
                        .push(ConversationTurn::tool_request(call.clone()));
                    let result = self.registry.invoke(&call.name, &call.arguments).await;
                    debug!(tool = %call.name, success = result.is_success(), "tool finished");
                    run.transcript
                        .turns
                        .push(ConversationTurn::observation(call.clone(), result.observation()));
                    run.steps.push(AgentStep {
                        action: Action::ToolCall(call),
                        result: Some(result)
                    });
                    run.transition(LoopState::AwaitingModel);
                }
            }
        }
        run.fail(TurnFailure::LoopBudgetExceeded(max_iterations))
    }

    fn seed_turns(&self, user_text: &str, history: &[ConversationTurn]) -> Vec<ConversationTurn> {
        let dialogue: Vec<&ConversationTurn> = history.iter().filter(|t| t.is_dialogue()).collect();
        let skip = dialogue.len().saturating_sub(self.settings.history_limit);
        let mut turns: Vec<ConversationTurn> = dialogue.into_iter().skip(skip).cloned().collect();
        turns.push(ConversationTurn::user(user_text));
        turns
    }
}

struct TurnRun {
    transcript: Transcript,
    steps:      Vec<AgentStep>,
    state:      LoopState
}

impl TurnRun {
    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "agent state change");
        self.state = next;
    }

    fn finish(mut self, answer: String) -> TurnOutcome {
        self.transition(LoopState::Done);
        info!(steps = self.steps.len(), "turn completed");
        self.steps.push(AgentStep {
            action: Action::final_answer(answer.clone()),
            result: None
        });
        self.transcript
            .turns
            .push(ConversationTurn::assistant(answer.clone()));
        TurnOutcome {
            answer,
            state: self.state,
            steps: self.steps,
            transcript: self.transcript,
            failure: None
        }
    }

    fn fail(mut self, failure: TurnFailure) -> TurnOutcome {
        self.transition(LoopState::Failed);
        error!(error = %failure, steps = self.steps.len(), "turn failed");
        TurnOutcome {
            answer: failure.user_message().to_string(),
            state: self.state,
            steps: self.steps,
            transcript: self.transcript,
            failure: Some(failure)
        }
    }
}
