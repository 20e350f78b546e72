//! taskloom command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use taskloom_agent::{RunContext, ToolRegistry, WorkflowController, WorkflowResult, WorkflowStatus};
use taskloom_config::{self, Config, API_KEY_ENV};
use taskloom_provider::ChatCompletionsProvider;
use taskloom_store::{Plan, StateLayout};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Initialize config, workspace and state directory
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing taskloom...");
    println!("{}", RULE);

    let config = taskloom_config::init()
        .await
        .context("Failed to initialize config")?;
    StateLayout::new(config.state_path())
        .ensure()
        .await
        .context("Failed to create state directory")?;

    println!("Config:    {}", taskloom_config::config_path().display());
    println!("Workspace: {}", config.workspace_path().display());
    println!("State:     {}", config.state_path().display());

    println!("\n◆ taskloom initialized");
    println!("\nNext steps:");
    println!(
        "  1. Add your API key to {} or export {}",
        taskloom_config::config_path().display(),
        API_KEY_ENV
    );
    println!("  2. Run a request: taskloom run -m \"Create a hello world script\"");

    Ok(())
}

async fn controller() -> Result<WorkflowController> {
    let config = Config::load().await.context("Failed to load config")?;
    let api_key = config.api_key().with_context(|| {
        format!(
            "No API key configured. Set {} or provider.api_key in {}",
            API_KEY_ENV,
            taskloom_config::config_path().display()
        )
    })?;

    tokio::fs::create_dir_all(config.workspace_path())
        .await
        .with_context(|| format!("Failed to create workspace {:?}", config.workspace_path()))?;

    let provider = ChatCompletionsProvider::new(
        api_key,
        config.api_base(),
        Some(config.default_model()),
    );
    let ctx = RunContext::from_config(&config, Arc::new(provider));

    // Ctrl+C stops retries and the task loop at the next boundary
    let cancel = ctx.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("◆ Interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });

    Ok(WorkflowController::new(ctx))
}

fn print_result(result: &WorkflowResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    match result.status {
        WorkflowStatus::Success => println!("\n◆ {}", result.message),
        WorkflowStatus::Error => println!("\n✗ {}", result.message),
        WorkflowStatus::Exit => {}
    }
    if !result.completed_tasks.is_empty() {
        println!("Completed: {}", result.completed_tasks.join(", "));
    }
    if let Some(summary) = &result.summary {
        println!("\n{}", summary);
    }
    Ok(())
}

/// Run one request, or read requests from stdin until `exit`
pub async fn run_command(message: Option<String>, json: bool) -> Result<()> {
    let controller = controller().await?;

    if let Some(message) = message {
        let result = controller.execute(&message).await;
        print_result(&result, json)?;
        if result.status == WorkflowStatus::Error {
            anyhow::bail!("Run failed: {}", result.message);
        }
        return Ok(());
    }

    println!("◆ Interactive mode (type 'exit' to quit)");
    println!("{}", RULE);

    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let result = controller.execute(input).await;
        if result.status == WorkflowStatus::Exit {
            break;
        }
        print_result(&result, json)?;
        println!();

        if controller.context().is_cancelled() {
            info!("Cancelled, leaving interactive mode");
            break;
        }
    }

    Ok(())
}

/// Continue an interrupted run
pub async fn resume_command(json: bool) -> Result<()> {
    let controller = controller().await?;
    let result = controller.resume().await;
    print_result(&result, json)?;
    if result.status == WorkflowStatus::Error {
        anyhow::bail!("Resume failed: {}", result.message);
    }
    Ok(())
}

fn marker(exists: bool) -> &'static str {
    if exists {
        "[OK]"
    } else {
        "[Missing]"
    }
}

/// Show config and checklist progress
pub async fn status_command() -> Result<()> {
    let config_path = taskloom_config::config_path();
    let config = Config::load().await.context("Failed to load config")?;
    let workspace = config.workspace_path();
    let layout = StateLayout::new(config.state_path());

    println!("◆ taskloom Status");
    println!("{}", RULE);

    println!("Config:    {} {}", config_path.display(), marker(config_path.exists()));
    println!("Workspace: {} {}", workspace.display(), marker(workspace.exists()));
    println!(
        "State:     {} {}",
        layout.root().display(),
        marker(layout.root().exists())
    );
    println!("Model:     {}", config.default_model());
    println!(
        "API Key:   {}",
        if config.has_api_key() { "[Set]" } else { "[Missing]" }
    );
    println!(
        "Retry:     {} attempts, {}s apart, {}s per attempt",
        config.retry.max_attempts, config.retry.delay_secs, config.retry.attempt_timeout_secs
    );
    println!("Rounds:    {} per task", config.max_rounds());

    let checklist = layout.checklist();
    if checklist.exists() {
        match Plan::parse(&checklist.load_text().await) {
            Ok(plan) => {
                let (done, total) = plan.progress();
                println!("\nChecklist: {}/{} done", done, total);
                match plan.next_unchecked() {
                    Some(item) => println!("Next:      {}", item.label()),
                    None => println!("Next:      -"),
                }
            }
            Err(e) => println!("\nChecklist: unreadable ({})", e),
        }
        let logs = layout.operation_logs().list_task_ids().await;
        println!("Logs:      {}", logs.len());
    } else {
        println!("\nChecklist: none");
    }

    println!("\n◆ Ready");
    Ok(())
}

/// List the tools available to the model
pub async fn tools_command() -> Result<()> {
    let config = Config::load().await.context("Failed to load config")?;
    let registry = ToolRegistry::with_defaults(
        &config.workspace_path(),
        std::time::Duration::from_secs(config.tools.exec_timeout_secs),
    );

    println!("◆ Tools ({})", registry.len());
    println!("{}", RULE);
    println!("{}", registry.summary_lines());
    Ok(())
}
