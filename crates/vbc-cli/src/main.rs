use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use jiff::civil::Date;
use tracing_subscriber::EnvFilter;
use vbc_core::Period;
use vbc_core::models::workflow::{WorkflowRequest, WorkflowState};
use vbc_orchestrator::Orchestrator;

use vbc_cli::app;
use vbc_cli::config::{self, VbcConfig};

#[derive(Parser)]
#[command(name = "vbc")]
#[command(about = "Value-based-care contract analytics workflows")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "VBC_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "VBC_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Evaluation date for date-based validation rules (defaults to today)
    #[arg(long, env = "VBC_AS_OF")]
    as_of: Option<Date>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Submit and run a workflow, or continue an interrupted one
    Run {
        #[arg(long, required_unless_present = "workflow")]
        contract: Option<String>,
        #[arg(long, required_unless_present = "workflow")]
        year: Option<i16>,
        #[arg(long, required_unless_present = "workflow")]
        month: Option<i8>,
        /// Continue this workflow from its persisted position
        #[arg(long, conflicts_with_all = ["contract", "year", "month"])]
        workflow: Option<String>,
    },
    /// Show one workflow
    Status {
        workflow_id: String,
        /// Print the full persisted state as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all workflows, oldest first
    List,
    Pause { workflow_id: String },
    Resume { workflow_id: String },
    Cancel { workflow_id: String },
    /// Write a starter configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match cli.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Command::InitConfig { force } = cli.command {
        if config_path.exists() && !force {
            return Err(eyre::eyre!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            ));
        }
        config::save_config(&config_path, &VbcConfig::default())?;
        println!("wrote {}", config_path.display());
        return Ok(());
    }

    let config = config::load_config(&config_path)?;
    let orchestrator = app::build_orchestrator(&config, cli.as_of).await?;

    match cli.command {
        Command::Run {
            contract,
            year,
            month,
            workflow,
        } => {
            let workflow_id = match workflow {
                Some(id) => id,
                None => {
                    let (Some(contract_id), Some(year), Some(month)) = (contract, year, month)
                    else {
                        return Err(eyre::eyre!("--contract, --year and --month are required"));
                    };
                    let request = WorkflowRequest {
                        contract_id,
                        period: Period::new(year, month)?,
                    };
                    let state = orchestrator.submit(request).await?;
                    println!("submitted {}", state.workflow_id);
                    state.workflow_id
                }
            };
            let state = drive(&orchestrator, &workflow_id, false).await?;
            finish(&orchestrator, &config, &state).await?;
        }
        Command::Resume { workflow_id } => {
            let state = drive(&orchestrator, &workflow_id, true).await?;
            finish(&orchestrator, &config, &state).await?;
        }
        Command::Status { workflow_id, json } => {
            let state = orchestrator.status(&workflow_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print!("{}", app::describe(&state));
            }
        }
        Command::List => {
            for state in orchestrator.list().await? {
                println!(
                    "{}  {}  {}  {}  {}",
                    state.workflow_id,
                    state.contract_id,
                    state.period,
                    state.status,
                    state.created_at
                );
            }
        }
        Command::Pause { workflow_id } => {
            let state = orchestrator.pause(&workflow_id).await?;
            report_control(&state, "pause");
        }
        Command::Cancel { workflow_id } => {
            let state = orchestrator.cancel(&workflow_id).await?;
            report_control(&state, "cancel");
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// Run or resume in the foreground. Ctrl-C requests a pause, which the
/// workflow honors at its next stage boundary.
async fn drive(
    orchestrator: &Orchestrator,
    workflow_id: &str,
    resume: bool,
) -> eyre::Result<WorkflowState> {
    let run = async {
        if resume {
            orchestrator.resume(workflow_id).await
        } else {
            orchestrator.run(workflow_id).await
        }
    };
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(workflow_id, "interrupt received, pausing at next stage boundary");
            orchestrator.pause(workflow_id).await?;
            Ok(run.await?)
        }
    }
}

async fn finish(
    orchestrator: &Orchestrator,
    config: &VbcConfig,
    state: &WorkflowState,
) -> eyre::Result<()> {
    print!("{}", app::describe(state));
    let written =
        app::export_artifacts(orchestrator.store().as_ref(), state, &config.output_dir).await?;
    for path in written {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn report_control(state: &WorkflowState, operation: &str) {
    match state.control {
        Some(_) => println!(
            "{}: {operation} requested, will apply at the next stage boundary",
            state.workflow_id
        ),
        None => println!("{}: {}", state.workflow_id, state.status),
    }
}
