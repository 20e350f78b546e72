//! Prompt templates for each stage

use chrono::Local;
use std::path::Path;

const REPLY_FORMAT: &str = r#"{
  "todo_item": "the checklist step you are working on",
  "step_summary": "one-line summary of this step",
  "action_type": "tool | history | none",
  "tool_name": "tool to call (action_type = tool only)",
  "tool_params": {},
  "pull_history": "1.1, 1.2 (action_type = history only)",
  "explanation": "what you are doing and why",
  "success": true
}"#;

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M (%A)").to_string()
}

pub const ANALYSIS_SYSTEM: &str = r#"You are the analysis stage of a task orchestrator.

Decide whether the user's request needs a multi-step plan. Greetings, questions
you can answer directly and other conversational input do not. Anything that
requires creating, changing or inspecting files or running commands does.

Reply with strict JSON:
{
  "need_planning": true,
  "complexity": "none | low | medium | high",
  "message": "your direct answer when no planning is needed, otherwise a short restatement of the goal"
}"#;

pub fn planning_system(tool_catalog: &str) -> String {
    format!(
        r###"You are the planning stage of a task orchestrator.

Break the user's request into a two-level checklist. Keep small requests small.
Sections are numbered headings; items are checkboxes numbered N.M under them.
Never nest deeper than two levels and never put a checkbox on a heading.

Available tools, which the plan may rely on:
{}

Reply with strict JSON:
{{
  "analysis": "what the user needs",
  "tasks": {{
    "task_name": "short name for the whole plan",
    "complexity": "low | medium | high",
    "task_structure": "## 1. <section>\n- [ ] 1.1 <item>\n- [ ] 1.2 <item>\n## 2. <section>\n- [ ] 2.1 <item>"
  }},
  "execution_plan": "overall approach"
}}"###,
        tool_catalog
    )
}

pub fn planning_request(user_input: &str) -> String {
    format!(
        "Create an execution plan for this request:\n\n{}\n\nReply with JSON only.",
        user_input
    )
}

/// Checklist used when the planning stage produced nothing usable
pub fn default_plan(user_input: &str) -> String {
    let goal = user_input.lines().next().unwrap_or("").trim();
    let goal = if goal.is_empty() { "Complete the request" } else { goal };
    format!("## 1. {}\n- [ ] 1.1 {}\n", goal, goal)
}

pub fn refinement_system(tool_summary: &str) -> String {
    format!(
        r#"Current time: {}.

You refine one checklist item into atomic, executable steps.
1. current_task must start with the full item number, e.g. "1.1 Create config file".
2. Only handle the first unchecked item ("- [ ]").
3. Each step is one atomic operation (a file change, a command, a config edit).
4. Give each step its notes and the ways it could go wrong.
5. Installing a dependency is always its own step.
6. Prefer tools over shell commands, and shell commands over scripts.

Available tools:
{}

Reply with strict JSON:
{{
  "current_task": "1.1 <item text>",
  "task_description": "what this item achieves",
  "sub_tasks": [
    {{ "step": 1, "action": "what to do", "notes": ["..."], "risks": ["..."] }}
  ]
}}"#,
        now(),
        tool_summary
    )
}

pub fn refinement_request(plan_text: &str) -> String {
    format!(
        "Refine the first unchecked item of this checklist:\n\n{}\n\nReply with JSON only.",
        plan_text
    )
}

pub fn operate_system(tool_catalog: &str, workspace: &Path) -> String {
    format!(
        r#"Current time: {}. Operating system: {}. Workspace: {}

You carry out one refined checklist item by calling tools, one action per reply.

You receive the refinement document (the steps of the current item) and the
overall checklist (for context only). Work through the refinement steps in
order. Every change to the system must go through a tool.

Available tools:
{}

Rules:
- Use action_type "tool" with tool_name and tool_params to call a tool. Set
  success to false while you wait for its result.
- Use action_type "history" with pull_history to read what earlier checklist
  items did. This is faster and more accurate than repeating their work.
- Use action_type "none" when no action is needed.
- Set success to true only once every step of the current item is done.
- Paths are relative to the workspace unless absolute.

Reply with strict JSON:
{}"#,
        now(),
        std::env::consts::OS,
        workspace.display(),
        tool_catalog,
        REPLY_FORMAT
    )
}

pub fn operate_first_step(refinement: &str, plan_text: &str, workspace: &Path) -> String {
    format!(
        r#"# Refinement document
{}

# Checklist (context only)
{}

Continue with the first unfinished step of the refinement document.
Workspace: {}
Reply with strict JSON."#,
        refinement,
        plan_text,
        workspace.display()
    )
}

pub fn operate_tool_step(
    previous_operation: &str,
    tool_result: &str,
    refinement: &str,
    plan_text: &str,
    workspace: &Path,
) -> String {
    format!(
        r#"The tool you requested has finished.

# Your previous reply
{}

# Tool result
{}

# Refinement document
{}

# Checklist (context only)
{}

Check whether the tool succeeded. If every step of the current item is now
done, set success to true. If it failed, explain why and set success to false.
Workspace: {}
Reply with strict JSON in the same format:
{}"#,
        previous_operation,
        tool_result,
        refinement,
        plan_text,
        workspace.display(),
        REPLY_FORMAT
    )
}

pub fn operate_history_step(
    previous_operation: &str,
    history: &str,
    refinement: &str,
    plan_text: &str,
    workspace: &Path,
) -> String {
    format!(
        r#"Here is the history you asked for.

# Your previous reply
{}

# History
{}

# Refinement document
{}

# Checklist (context only)
{}

Use the history to decide your next action.
Workspace: {}
Reply with strict JSON in the same format:
{}"#,
        previous_operation,
        history,
        refinement,
        plan_text,
        workspace.display(),
        REPLY_FORMAT
    )
}

pub const SUMMARY_SYSTEM: &str = r#"You summarize what a task orchestrator did.

Given the operation history of every checklist item, write a concise markdown
report: what was accomplished, which files or commands were involved, and
anything that failed or needs follow-up."#;

pub fn summary_request(formatted_history: &str) -> String {
    format!(
        "Summarize this operation history:\n\n{}",
        formatted_history
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_parses() {
        let text = default_plan("Build a CLI\nwith details");
        assert_eq!(text, "## 1. Build a CLI\n- [ ] 1.1 Build a CLI\n");

        let plan = taskloom_store::Plan::parse(&text).unwrap();
        assert_eq!(plan.next_unchecked().unwrap().id, "1.1");
    }

    #[test]
    fn test_default_plan_blank_input() {
        assert!(default_plan("   ").contains("- [ ] 1.1 Complete the request"));
    }

    #[test]
    fn test_planning_system_keeps_full_template() {
        let prompt = planning_system("- read_file");
        assert!(prompt.contains("- read_file"));
        assert!(prompt.contains(
            "\"task_structure\": \"## 1. <section>\\n- [ ] 1.1 <item>\\n- [ ] 1.2 <item>\\n## 2. <section>\\n- [ ] 2.1 <item>\""
        ));
        assert!(prompt.ends_with("\"execution_plan\": \"overall approach\"\n}"));
    }

    #[test]
    fn test_operate_system_embeds_catalog_and_workspace() {
        let prompt = operate_system("[{\"name\": \"read_file\"}]", Path::new("/work"));
        assert!(prompt.contains("read_file"));
        assert!(prompt.contains("Workspace: /work"));
        assert!(prompt.contains("\"action_type\""));
    }

    #[test]
    fn test_tool_step_includes_result() {
        let prompt = operate_tool_step(
            "{\"action_type\":\"tool\"}",
            "{\"status\":\"success\"}",
            "# 1.1",
            "## 1.",
            Path::new("/work"),
        );
        assert!(prompt.contains("# Tool result\n{\"status\":\"success\"}"));
    }
}
