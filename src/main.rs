use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tams::app::App;
use tams::ccs::types::Job;
use tams::config::{StackConfig, TamsConfig};
use tams::shutdown::install_shutdown_handler;
use tams::storage::Storage;

#[derive(Parser, Debug)]
#[command(name = "tams")]
#[command(version)]
#[command(about = "Crane job coordinator with yard bookkeeping")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the coordinator (poller, crane endpoint and web UI)
    Server(ServerArgs),

    /// Inspect a yard snapshot file
    Yard {
        /// Snapshot file to read
        #[arg(long, default_value = "export.json")]
        snapshot: PathBuf,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },

    /// Show the job queue of a running coordinator
    Jobs {
        /// Web UI address of the coordinator
        #[arg(long, short = 'a', default_value = "http://127.0.0.1:7000")]
        addr: String,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Crane control system host; port 9999 is appended
    #[arg(long, conflicts_with = "ccs_url")]
    ccs: Option<String>,

    /// Full crane control system base URL
    #[arg(long)]
    ccs_url: Option<String>,

    /// Port for the web UI
    #[arg(long, default_value = "7000")]
    web_port: u16,

    /// Port the crane posts status, details, alarms and metrics to
    #[arg(long, default_value = "9998")]
    crane_port: u16,

    /// Yard snapshot, loaded at startup if present and written on shutdown
    #[arg(long, default_value = "export.json")]
    snapshot: PathBuf,

    /// Poll interval towards the crane in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Seed stacks used when no snapshot exists (comma-separated or repeated,
    /// format: "name:x:y:z[:height]")
    /// Example: "A1:0:0:0,A2:3000:0:0:3"
    #[arg(long = "stack", alias = "stacks", value_delimiter = ',')]
    stacks: Vec<String>,

    /// Slot count for seed stacks without an explicit height
    #[arg(long, default_value = "2")]
    stack_height: usize,

    /// Log full job payloads and enable debug output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Trace every HTTP request
    #[arg(long)]
    log_web_calls: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct StackOutput {
    name: String,
    x: i64,
    y: i64,
    z: i64,
    height: usize,
    units: Vec<String>,
}

#[derive(Serialize)]
struct YardOutput {
    stacks: Vec<StackOutput>,
    crane: Option<String>,
}

#[derive(serde::Deserialize, Serialize)]
struct JobsOutput {
    pending: Vec<Job>,
    running: Option<Job>,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_stacks(stacks: &[String]) -> Vec<StackConfig> {
    stacks
        .iter()
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| match s.parse::<StackConfig>() {
            Ok(stack) => Some(stack),
            Err(e) => {
                tracing::warn!(stack = %s, error = %e, "Invalid stack, expected name:x:y:z[:height]");
                None
            }
        })
        .collect()
}

fn ccs_url(args: &ServerArgs) -> String {
    match (&args.ccs_url, &args.ccs) {
        (Some(url), _) => url.clone(),
        (None, Some(host)) => format!("http://{host}:9999"),
        (None, None) => TamsConfig::default().ccs_url,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.verbose);

    let config = TamsConfig {
        ccs_url: ccs_url(&args),
        crane_listen_addr: SocketAddr::from(([0, 0, 0, 0], args.crane_port)),
        web_listen_addr: SocketAddr::from(([0, 0, 0, 0], args.web_port)),
        poll_interval_ms: args.poll_interval_ms,
        snapshot_path: args.snapshot,
        stacks: parse_stacks(&args.stacks),
        default_stack_height: args.stack_height,
        verbose: args.verbose,
        log_web_calls: args.log_web_calls,
        ..TamsConfig::default()
    };

    tracing::info!(
        ccs_url = %config.ccs_url,
        crane_addr = %config.crane_listen_addr,
        web_addr = %config.web_listen_addr,
        snapshot = %config.snapshot_path.display(),
        stacks = ?config.stacks.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "Starting TAMS"
    );

    let app = App::new(config)?;
    let shutdown = install_shutdown_handler();
    app.run(shutdown).await?;
    Ok(())
}

fn handle_yard(snapshot: PathBuf, output_format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::import_json(&snapshot)?;
    let output = YardOutput {
        stacks: storage
            .stacks()
            .iter()
            .map(|stack| StackOutput {
                name: stack.name.clone(),
                x: stack.coordinates.x,
                y: stack.coordinates.y,
                z: stack.coordinates.z,
                height: stack.height,
                units: stack
                    .container
                    .iter()
                    .filter_map(|slot| slot.number().map(str::to_owned))
                    .collect(),
            })
            .collect(),
        crane: storage.crane().number().map(str::to_owned),
    };

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Table => {
            println!("{:<10} {:>8} {:>8} {:>8} {:>6}  UNITS", "STACK", "X", "Y", "Z", "HEIGHT");
            for stack in &output.stacks {
                println!(
                    "{:<10} {:>8} {:>8} {:>8} {:>6}  {}",
                    stack.name,
                    stack.x,
                    stack.y,
                    stack.z,
                    stack.height,
                    stack.units.join(", ")
                );
            }
            println!();
            println!("Crane: {}", output.crane.as_deref().unwrap_or("-"));
        }
    }
    Ok(())
}

async fn handle_jobs(addr: &str, output_format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/jobs", addr.trim_end_matches('/'));
    let jobs: JobsOutput = reqwest::get(&url).await?.json().await?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&jobs)?),
        OutputFormat::Table => {
            println!("{:<8} {:<8} {:<16} {:>8} {:>8} {:>8}", "STATE", "TYPE", "UNIT", "X", "Y", "Z");
            let running = jobs.running.iter().map(|job| ("RUNNING", job));
            let pending = jobs.pending.iter().map(|job| ("PENDING", job));
            for (state, job) in running.chain(pending) {
                println!(
                    "{:<8} {:<8} {:<16} {:>8} {:>8} {:>8}",
                    state,
                    job.job_type,
                    job.unit.number,
                    job.target.x,
                    job.target.y,
                    job.target.z
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => run_server(server_args).await?,
        Commands::Yard { snapshot, output } => handle_yard(snapshot, &output)?,
        Commands::Jobs { addr, output } => handle_jobs(&addr, &output).await?,
    }

    Ok(())
}
