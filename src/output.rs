use colored::Colorize;
use serde::Serialize;

use crate::{
    agent::{Action, AgentStep, LoopState, TurnOutcome},
    guard::GuardVerdict,
    statement::ClassificationResult
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    /// Include agent steps alongside answers
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

/// Guard report for one statement
#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    pub sql:            &'a str,
    pub verdict:        &'a GuardVerdict,
    pub classification: &'a ClassificationResult
}

/// Answer report for one question
#[derive(Debug, Serialize)]
pub struct AnswerReport<'a> {
    pub question: &'a str,
    pub answer:   &'a str,
    pub state:    LoopState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps:    Option<&'a [AgentStep]>
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).unwrap_or_default(),
        _ => serde_json::to_string_pretty(value).unwrap_or_default()
    }
}

/// Format a guard verdict
pub fn format_check_result(
    sql: &str,
    verdict: &GuardVerdict,
    classification: &ClassificationResult,
    opts: &OutputOptions
) -> String {
    if opts.format != OutputFormat::Text {
        let report = CheckReport {
            sql,
            verdict,
            classification
        };
        return serialize(&report, opts.format);
    }
    let status = if verdict.accepted {
        "ACCEPTED"
    } else {
        "REJECTED"
    };
    let status = match (opts.colored, verdict.accepted) {
        (true, true) => status.green().bold().to_string(),
        (true, false) => status.red().bold().to_string(),
        (false, _) => status.to_string()
    };
    let mut output = status;
    if let Some(reason) = &verdict.reason {
        output.push_str(&format!(": {}", reason));
    }
    output.push_str(&format!(
        "\n  statements: {}, kind: {}, parsed: {}",
        classification.statement_count,
        classification.primary_kind,
        classification.parse_succeeded
    ));
    output
}

/// Format the answer to one question
pub fn format_answer(question: &str, outcome: &TurnOutcome, opts: &OutputOptions) -> String {
    if opts.format != OutputFormat::Text {
        let report = AnswerReport {
            question,
            answer: &outcome.answer,
            state: outcome.state,
            steps: opts.verbose.then_some(outcome.steps.as_slice())
        };
        return serialize(&report, opts.format);
    }
    let mut output = String::new();
    if opts.verbose {
        output.push_str(&format_steps(&outcome.steps, opts));
    }
    output.push_str(&outcome.answer);
    output
}

/// Format the allowed table list
pub fn format_tables(tables: &[String], opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Text => {
            let mut output = String::new();
            for table in tables {
                if opts.colored {
                    output.push_str(&format!("  {}\n", table.cyan()));
                } else {
                    output.push_str(&format!("  {}\n", table));
                }
            }
            output
        }
        format => serialize(&tables, format)
    }
}

fn format_steps(steps: &[AgentStep], opts: &OutputOptions) -> String {
    let mut output = String::new();
    for (index, step) in steps.iter().enumerate() {
        let Action::ToolCall(call) = &step.action else {
            continue;
        };
        let header = format!("[{}] {} {}", index + 1, call.name, call.arguments);
        if opts.colored {
            output.push_str(&header.dimmed().to_string());
        } else {
            output.push_str(&header);
        }
        output.push('\n');
        match &step.result {
            Some(result) if result.is_success() => output.push_str("    ok\n"),
            Some(result) => output.push_str(&format!("    {}\n", result.observation())),
            None => output.push_str("    not executed\n")
        }
    }
    if !output.is_empty() {
        output.push('\n');
    }
    output
}
