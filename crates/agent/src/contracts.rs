//! Reply shapes of each stage

use serde_json::Value;
use tracing::{debug, warn};

use taskloom_provider::ChatResponse;
use taskloom_store::RefinementStep;

use crate::agent::ResponseContract;
use crate::reply::{as_bool, bool_field, extract_json, str_of, string_field};
use crate::{AgentError, Result};

/// Whether the request needs a checklist at all
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReply {
    pub need_planning: bool,
    pub message: String,
    pub complexity: Option<String>,
}

impl ResponseContract for AnalysisReply {
    fn parse(response: &ChatResponse) -> Result<Self> {
        let text = response.text_content();

        if let Some(json) = extract_json(text) {
            return Ok(Self {
                need_planning: json.get("need_planning").and_then(as_bool).unwrap_or(true),
                message: str_of(&json, "message"),
                complexity: json
                    .get("complexity")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        debug!("Analysis reply is not JSON, assuming planning is needed");
        Ok(Self {
            need_planning: bool_field(text, "need_planning").unwrap_or(true),
            message: text.trim().to_string(),
            complexity: None,
        })
    }
}

/// Checklist proposed by the planning stage
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanningReply {
    pub analysis: Option<String>,
    pub task_name: Option<String>,
    /// Checklist markdown; `None` when the reply carried none
    pub task_structure: Option<String>,
}

impl ResponseContract for PlanningReply {
    fn parse(response: &ChatResponse) -> Result<Self> {
        let text = response.text_content();

        if let Some(json) = extract_json(text) {
            let tasks = json.get("tasks").cloned().unwrap_or(Value::Null);
            let structure = tasks
                .get("task_structure")
                .or_else(|| json.get("task_structure"))
                .and_then(Value::as_str)
                .map(str::to_string);

            return Ok(Self {
                analysis: json.get("analysis").and_then(Value::as_str).map(str::to_string),
                task_name: tasks.get("task_name").and_then(Value::as_str).map(str::to_string),
                task_structure: structure.filter(|s| !s.trim().is_empty()),
            });
        }

        let structure = string_field(text, "task_structure");
        if structure.is_none() {
            warn!("Planning reply carries no task structure");
        }
        Ok(Self {
            task_structure: structure.filter(|s| !s.trim().is_empty()),
            ..Default::default()
        })
    }
}

/// Steps for the first open checklist item
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementReply {
    pub current_task: String,
    pub task_description: String,
    pub steps: Vec<RefinementStep>,
}

impl ResponseContract for RefinementReply {
    fn parse(response: &ChatResponse) -> Result<Self> {
        let text = response.text_content();

        if let Some(json) = extract_json(text) {
            let current_task = str_of(&json, "current_task");
            if !current_task.trim().is_empty() {
                return Ok(Self {
                    current_task,
                    task_description: str_of(&json, "task_description"),
                    steps: parse_steps(json.get("sub_tasks")),
                });
            }
        }

        // regex fallback never invents steps
        match string_field(text, "current_task") {
            Some(current_task) if !current_task.trim().is_empty() => {
                warn!("Refinement reply is not valid JSON, keeping the task without steps");
                Ok(Self {
                    current_task,
                    task_description: string_field(text, "task_description").unwrap_or_default(),
                    steps: Vec::new(),
                })
            }
            _ => Err(AgentError::MalformedResponse(
                "refinement reply has no current_task".to_string(),
            )),
        }
    }
}

fn parse_steps(value: Option<&Value>) -> Vec<RefinementStep> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let action = match item {
                Value::String(s) => s.clone(),
                _ => str_of(item, "action"),
            };
            if action.trim().is_empty() {
                return None;
            }

            let step_no = item
                .get("step")
                .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
                .map(|n| n as u32)
                .unwrap_or(idx as u32 + 1);

            Some(RefinementStep {
                step_no,
                action,
                notes: string_list(item.get("notes")),
                risks: string_list(item.get("risks")),
            })
        })
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// What the operator model wants to do this round
#[derive(Debug, Clone, PartialEq)]
pub enum OperationAction {
    Tool { name: String, params: Value },
    History { task_ids: Vec<String> },
    None,
}

/// One operation-loop reply
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReply {
    pub action: OperationAction,
    /// True unless the model explicitly said otherwise
    pub success: bool,
    pub explanation: String,
    pub step_summary: String,
    pub todo_item: String,
}

impl OperationReply {
    /// Interpret a reply; `None` when nothing in it reads as an action
    pub fn from_response(response: &ChatResponse) -> Option<Self> {
        let text = response.text_content();

        if let Some(json) = extract_json(text) {
            return Some(Self::from_json(&json));
        }

        let action_type = string_field(text, "action_type");
        let success = bool_field(text, "success");

        if action_type.is_some() || success.is_some() {
            let action = match action_type.as_deref().map(str::trim) {
                Some("tool") => OperationAction::Tool {
                    name: string_field(text, "tool_name").unwrap_or_default(),
                    params: Value::Object(Default::default()),
                },
                Some("history") => OperationAction::History {
                    task_ids: split_ids(&string_field(text, "pull_history").unwrap_or_default()),
                },
                _ => OperationAction::None,
            };
            return Some(Self {
                action,
                success: success.unwrap_or(true),
                explanation: string_field(text, "explanation").unwrap_or_default(),
                step_summary: string_field(text, "step_summary").unwrap_or_default(),
                todo_item: string_field(text, "todo_item").unwrap_or_default(),
            });
        }

        // native tool calls only count when the text carries no action
        response.tool_calls.first().map(|call| Self {
            action: OperationAction::Tool {
                name: call.name.clone(),
                params: call.arguments.clone(),
            },
            success: false,
            explanation: text.trim().to_string(),
            step_summary: String::new(),
            todo_item: String::new(),
        })
    }

    fn from_json(json: &Value) -> Self {
        let action_type = str_of(json, "action_type").trim().to_ascii_lowercase();

        let action = match action_type.as_str() {
            "tool" => OperationAction::Tool {
                name: str_of(json, "tool_name"),
                params: match json.get("tool_params") {
                    Some(Value::String(s)) => serde_json::from_str(s)
                        .unwrap_or_else(|_| Value::Object(Default::default())),
                    Some(v @ Value::Object(_)) => v.clone(),
                    _ => Value::Object(Default::default()),
                },
            },
            "history" => OperationAction::History {
                task_ids: match json.get("pull_history") {
                    Some(Value::Array(ids)) => ids
                        .iter()
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .filter(|id| !id.trim().is_empty())
                        .collect(),
                    Some(Value::String(s)) => split_ids(s),
                    Some(Value::Number(n)) => vec![n.to_string()],
                    _ => Vec::new(),
                },
            },
            _ => OperationAction::None,
        };

        Self {
            action,
            success: json.get("success").and_then(as_bool).unwrap_or(true),
            explanation: str_of(json, "explanation"),
            step_summary: str_of(json, "step_summary"),
            todo_item: str_of(json, "todo_item"),
        }
    }

    pub fn action_type(&self) -> &'static str {
        match self.action {
            OperationAction::Tool { .. } => "tool",
            OperationAction::History { .. } => "history",
            OperationAction::None => "none",
        }
    }
}

impl ResponseContract for OperationReply {
    fn parse(response: &ChatResponse) -> Result<Self> {
        Self::from_response(response).ok_or_else(|| {
            AgentError::MalformedResponse("operation reply has no action".to_string())
        })
    }
}

/// `"1.1, 1.2,1.3"` -> `["1.1", "1.2", "1.3"]`
pub fn split_ids(raw: &str) -> Vec<String> {
    raw.split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Free-form run summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReply(pub String);

impl ResponseContract for SummaryReply {
    fn parse(response: &ChatResponse) -> Result<Self> {
        let text = response.text_content();
        if text.trim().is_empty() {
            return Err(AgentError::MalformedResponse("empty summary".to_string()));
        }

        let summary = extract_json(text)
            .map(|json| str_of(&json, "summary"))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| text.trim().to_string());
        Ok(Self(summary))
    }
}
