//! Terminal front end for the staged research service.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use stagerun::client::{ApiClient, ClientConfig};
use stagerun::controller::{ReportGenerator, StageRunController, StageSnapshot};
use stagerun::core::{
    AgentConfig, AgentStatus, CreateAgentRequest, CreateProjectRequest, Project, StageInfo,
    StageResult, UpdateAgentRequest, FINAL_STAGE,
};
use stagerun::errors::StagerunError;
use stagerun::events::LoggingEventSink;
use stagerun::gate::ApproveOutcome;
use stagerun::markdown::to_plain_text;
use stagerun::observability::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the research service
    #[arg(long, env = "STAGERUN_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Timeout for ordinary requests, in seconds
    #[arg(long, env = "STAGERUN_REQUEST_TIMEOUT")]
    request_timeout: Option<f64>,

    /// Timeout for report generation, in seconds
    #[arg(long, env = "STAGERUN_REPORT_TIMEOUT")]
    report_timeout: Option<f64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage research projects
    Projects {
        #[command(subcommand)]
        action: ProjectCommand,
    },
    /// Show the stored result of a stage
    Stage {
        /// Project id
        project_id: String,
        /// Stage number (1-6)
        stage: u32,
    },
    /// Run a stage and follow its progress
    Run {
        /// Project id
        project_id: String,
        /// Stage number (1-6)
        stage: u32,
    },
    /// Approve a completed stage
    Approve {
        /// Project id
        project_id: String,
        /// Stage number (1-6)
        stage: u32,
    },
    /// Store a human override for a stage
    Override {
        /// Project id
        project_id: String,
        /// Stage number (1-6)
        stage: u32,
        /// Replacement synthesis
        content: String,
        /// Reviewer notes
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Generate and print the final report
    Report {
        /// Project id
        project_id: String,
    },
    /// Manage agent configurations
    Agents {
        #[command(subcommand)]
        action: AgentCommand,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// List projects
    List,
    /// Create a project
    Create {
        /// Display name
        name: String,
        /// The question to investigate
        research_question: String,
        /// Background for the agents
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Show a project and its stage progress
    Show {
        /// Project id
        project_id: String,
    },
    /// Delete a project
    Delete {
        /// Project id
        project_id: String,
    },
}

#[derive(Subcommand)]
enum AgentCommand {
    /// List agents
    List {
        /// Only agents of this stage
        #[arg(long)]
        stage: Option<u32>,
        /// Only agents visible to this project
        #[arg(long)]
        project: Option<String>,
    },
    /// Create an agent
    Create {
        /// Display name
        name: String,
        /// Role description
        role: String,
        /// System prompt
        system_prompt: String,
        /// Stage the agent runs in
        #[arg(long)]
        stage: u32,
        /// Point of view the agent argues from
        #[arg(long)]
        perspective: Option<String>,
        /// Scope the agent to one project
        #[arg(long)]
        project: Option<String>,
        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,
        /// Model name
        #[arg(long)]
        model: Option<String>,
    },
    /// Update fields of an agent
    Update {
        /// Agent id
        agent_id: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New role description
        #[arg(long)]
        role: Option<String>,
        /// New perspective
        #[arg(long)]
        perspective: Option<String>,
        /// New system prompt
        #[arg(long)]
        system_prompt: Option<String>,
        /// New sampling temperature
        #[arg(long)]
        temperature: Option<f64>,
        /// New model name
        #[arg(long)]
        model: Option<String>,
    },
    /// Delete an agent
    Delete {
        /// Agent id
        agent_id: String,
    },
    /// Enable or disable an agent
    Toggle {
        /// Agent id
        agent_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty };
    init_tracing(format, "stagerun=warn")?;

    let mut config = ClientConfig::new().with_base_url(cli.api_url.clone());
    if let Some(seconds) = cli.request_timeout {
        config = config.with_request_timeout(seconds);
    }
    if let Some(seconds) = cli.report_timeout {
        config = config.with_report_timeout(seconds);
    }
    let client = Arc::new(ApiClient::new(config).context("invalid client configuration")?);
    debug!(base_url = %client.config().base_url, "Client ready");

    match cli.command {
        Commands::Projects { action } => projects(&client, action, cli.json).await,
        Commands::Stage { project_id, stage } => {
            check_stage(stage)?;
            let controller = StageRunController::new(client, project_id, stage);
            let result = controller.load().await?;
            if cli.json {
                return print_json(&result);
            }
            match result {
                Some(result) => print_stage_result(&result),
                None => println!(
                    "Stage {stage} ({}) has not been run.",
                    StageInfo::name_for(stage)
                ),
            }
            Ok(())
        }
        Commands::Run { project_id, stage } => run_stage(client, project_id, stage, cli.json).await,
        Commands::Approve { project_id, stage } => {
            check_stage(stage)?;
            let controller = StageRunController::new(client, project_id, stage);
            controller.load().await?;
            match controller.approve().await? {
                ApproveOutcome::ProjectComplete => {
                    println!("Stage {stage} approved. Project complete.");
                }
                ApproveOutcome::Advance(next) => {
                    println!(
                        "Stage {stage} approved. Next: stage {next} ({}).",
                        StageInfo::name_for(next)
                    );
                }
                ApproveOutcome::Approved => println!("Stage {stage} approved."),
            }
            Ok(())
        }
        Commands::Override { project_id, stage, content, notes } => {
            check_stage(stage)?;
            let controller = StageRunController::new(client, project_id, stage);
            let result = controller.save_override(&content, &notes).await?;
            if cli.json {
                return print_json(&result);
            }
            println!("Override saved for stage {stage}.");
            Ok(())
        }
        Commands::Report { project_id } => {
            let generator = ReportGenerator::new(client, project_id);
            eprintln!("Generating report; this can take a few minutes...");
            let report = generator.generate().await?;
            if cli.json {
                return print_json(&report.blocks);
            }
            println!("{}", to_plain_text(&report.blocks));
            Ok(())
        }
        Commands::Agents { action } => agents(&client, action, cli.json).await,
    }
}

fn check_stage(stage: u32) -> Result<()> {
    if !(1..=FINAL_STAGE).contains(&stage) {
        bail!("stage must be between 1 and {FINAL_STAGE}, got {stage}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn projects(client: &ApiClient, action: ProjectCommand, json: bool) -> Result<()> {
    match action {
        ProjectCommand::List => {
            let projects = client.list_projects().await?;
            if json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                println!("No projects.");
            }
            for project in &projects {
                println!(
                    "{}  {:<12} stage {}  {}",
                    project.id, project.state, project.current_stage, project.name
                );
            }
        }
        ProjectCommand::Create { name, research_question, context } => {
            let request = CreateProjectRequest { name, research_question, context };
            let project = client.create_project(&request).await?;
            if json {
                return print_json(&project);
            }
            println!("Created project {}", project.id);
        }
        ProjectCommand::Show { project_id } => {
            let project = client.get_project(&project_id).await?;
            if json {
                return print_json(&project);
            }
            print_project(&project);
        }
        ProjectCommand::Delete { project_id } => {
            client.delete_project(&project_id).await?;
            println!("Deleted project {project_id}");
        }
    }
    Ok(())
}

async fn agents(client: &ApiClient, action: AgentCommand, json: bool) -> Result<()> {
    match action {
        AgentCommand::List { stage, project } => {
            let agents = client.list_agents(stage, project.as_deref()).await?;
            if json {
                return print_json(&agents);
            }
            for agent in &agents {
                print_agent(agent);
            }
        }
        AgentCommand::Create {
            name,
            role,
            system_prompt,
            stage,
            perspective,
            project,
            temperature,
            model,
        } => {
            check_stage(stage)?;
            let mut request = CreateAgentRequest::new(name, role, system_prompt, stage);
            if let Some(perspective) = perspective {
                request = request.with_perspective(perspective);
            }
            if let Some(project) = project {
                request = request.with_project(project);
            }
            if let Some(temperature) = temperature {
                request.temperature = temperature;
            }
            request.model = model;
            let agent = client.create_agent(&request).await?;
            if json {
                return print_json(&agent);
            }
            println!("Created agent {}", agent.id);
        }
        AgentCommand::Update {
            agent_id,
            name,
            role,
            perspective,
            system_prompt,
            temperature,
            model,
        } => {
            let request = UpdateAgentRequest {
                name,
                role,
                perspective,
                system_prompt,
                temperature,
                model,
                ..UpdateAgentRequest::default()
            };
            let agent = client.update_agent(&agent_id, &request).await?;
            if json {
                return print_json(&agent);
            }
            print_agent(&agent);
        }
        AgentCommand::Delete { agent_id } => {
            client.delete_agent(&agent_id).await?;
            println!("Deleted agent {agent_id}");
        }
        AgentCommand::Toggle { agent_id } => {
            let enabled = client.toggle_agent(&agent_id).await?;
            println!("Agent {agent_id} {}", if enabled { "enabled" } else { "disabled" });
        }
    }
    Ok(())
}

async fn run_stage(
    client: Arc<ApiClient>,
    project_id: String,
    stage: u32,
    json: bool,
) -> Result<()> {
    check_stage(stage)?;
    let controller = StageRunController::new(client, project_id, stage)
        .with_sink(Arc::new(LoggingEventSink::default()));
    controller.load().await?;

    let progress = tokio::spawn(follow_progress(controller.subscribe()));
    let handle = controller.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel("interrupted");
        }
    });

    let outcome = controller.run().await;
    interrupt.abort();
    progress.abort();

    match outcome {
        Ok(summary) => {
            if json {
                return print_json(&summary.result);
            }
            println!(
                "\nRun finished: {} events in {:.1}s",
                summary.events,
                summary.duration_ms / 1000.0
            );
            if let Some(result) = &summary.result {
                print_stage_result(result);
            }
            Ok(())
        }
        Err(StagerunError::Cancelled(reason)) => {
            println!("\nRun cancelled ({reason}); the stored result is unchanged.");
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!(err.user_message())),
    }
}

/// Prints a line whenever the phase or an agent's status changes.
async fn follow_progress(mut rx: watch::Receiver<StageSnapshot>) {
    let mut last = String::new();
    while rx.changed().await.is_ok() {
        let line = progress_line(&rx.borrow_and_update());
        if line != last {
            println!("{line}");
            last = line;
        }
    }
}

fn progress_line(snapshot: &StageSnapshot) -> String {
    let agents: Vec<String> = snapshot
        .agent_outputs()
        .iter()
        .map(|o| format!("{} {}", status_marker(o.status), o.agent_name))
        .collect();
    format!("[{}] {}", snapshot.phase, agents.join("  "))
}

fn status_marker(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Pending => "·",
        AgentStatus::Running => "…",
        AgentStatus::Complete => "✓",
        AgentStatus::Error => "✗",
    }
}

fn print_project(project: &Project) {
    println!("{} ({})", project.name, project.id);
    println!("Question: {}", project.research_question);
    if !project.context.is_empty() {
        println!("Context:  {}", project.context);
    }
    println!("State:    {}\n", project.state);
    for info in &stagerun::core::STAGES {
        let status = project
            .stage_result(info.number)
            .map_or_else(|| "pending".to_string(), |r| r.status.to_string());
        let marker = if info.number == project.current_stage { ">" } else { " " };
        println!("{marker} {}. {:<28} {status}", info.number, info.name);
    }
}

fn print_agent(agent: &AgentConfig) {
    let enabled = if agent.enabled { "on " } else { "off" };
    println!(
        "{}  [{enabled}] stage {}  {} ({})",
        agent.id, agent.stage, agent.name, agent.role
    );
}

fn print_stage_result(result: &StageResult) {
    println!("\nStage {}: {} [{}]", result.stage_number, result.stage_name(), result.status);
    for output in &result.agent_outputs {
        println!("\n{} {} ({})", status_marker(output.status), output.agent_name, output.status);
        if let Some(error) = &output.error {
            println!("  error: {error}");
        }
        if !output.content.is_empty() {
            for line in output.content.lines() {
                println!("  {line}");
            }
        }
        for claim in &output.claims {
            println!("  * {} ({:.0}%)", claim.text, claim.confidence * 100.0);
        }
    }
    if let Some(report) = &result.conflict_report {
        println!("\nDebate");
        for point in &report.agreements {
            println!("  agree: {}: {}", point.topic, point.summary);
        }
        for point in &report.disagreements {
            println!("  disagree: {}: {}", point.topic, point.summary);
            for position in &point.positions {
                println!("    {}: {}", position.agent_name, position.position);
            }
        }
        for tension in &report.unresolved_tensions {
            println!("  unresolved: {tension}");
        }
        if !report.synthesis.is_empty() {
            println!("  synthesis: {}", report.synthesis);
        }
    }
    if let Some(content) = &result.human_override {
        println!("\nOverride\n  {content}");
        if !result.human_notes.is_empty() {
            println!("  notes: {}", result.human_notes);
        }
    }
}
