use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use flowrun::analyzer::analyze_file;
use flowrun::config::EngineConfig;
use flowrun::matcher::match_scripts;
use flowrun::pipeline::run_pipeline;
use flowrun::runtime::stream::ExecEvent;
use flowrun::runtime::supervisor::Supervisor;
use flowrun::runtime::{NodeExecutor, NodeSpec};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Statically analyze a Python script
    Analyze {
        /// Path to the script
        file: PathBuf,

        /// Show only the entry point's wiring view
        #[arg(long)]
        entry: bool,
    },

    /// Detect shared variables between two scripts
    Connect {
        /// Upstream script
        source: PathBuf,
        /// Downstream script
        target: PathBuf,
    },

    /// Execute a single script node
    Exec {
        /// Path to the script
        file: PathBuf,

        /// Call arguments for the entry function (key=value)
        #[arg(long, short = 'D', value_parser = parse_key_val)]
        arg: Vec<(String, serde_json::Value)>,

        /// Substitute values for input() calls, consumed in order (name=value)
        #[arg(long, short = 'I', value_parser = parse_input_val)]
        input: Vec<(String, String)>,

        /// Node identifier used in logs and the process table
        #[arg(long, default_value = "cli")]
        node_id: String,

        /// Relay stdout lines as they are produced
        #[arg(long)]
        stream: bool,

        /// Per-node timeout in seconds (ignored with --stream)
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Python interpreter to launch
        #[arg(long, default_value = "python3")]
        python: String,
    },

    /// Execute a pipeline described by a JSON file of node specs
    Pipeline {
        /// Path to the pipeline JSON (array of node specs)
        file: PathBuf,

        /// Per-node timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Python interpreter to launch
        #[arg(long, default_value = "python3")]
        python: String,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].to_string();
    let val_str = &s[pos + 1..];
    // Try parsing as JSON, otherwise treat as string
    let val = serde_json::from_str(val_str)
        .unwrap_or_else(|_| serde_json::Value::String(val_str.to_string()));
    Ok((key, val))
}

fn parse_input_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid NAME=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, entry } => {
            let analysis = analyze_file(&file);
            if entry {
                match analysis.entry_view() {
                    Some(view) => print_json(&view)?,
                    None => anyhow::bail!(
                        "no function or input assignments found in {}",
                        file.display()
                    ),
                }
            } else {
                print_json(&analysis)?;
            }
        }

        Commands::Connect { source, target } => {
            let source_analysis = analyze_file(&source);
            let target_analysis = analyze_file(&target);
            let report = match_scripts(&source_analysis, &target_analysis)?;
            print_json(&report)?;
        }

        Commands::Exec {
            file,
            arg,
            input,
            node_id,
            stream,
            timeout,
            python,
        } => {
            let config = EngineConfig::default()
                .with_timeout(Duration::from_secs(timeout))
                .with_python_bin(python);
            let supervisor = Supervisor::new(config);

            let spec = NodeSpec {
                node_id,
                name: None,
                script_path: file,
                call_arguments: arg.into_iter().collect(),
                input_values: input,
            };

            if stream {
                let mut rx = supervisor.launch_streaming(&spec).await?;
                while let Some(event) = rx.recv().await {
                    match event {
                        ExecEvent::Stdout(line) => println!("{line}"),
                        ExecEvent::Result(result) => print_json(&result)?,
                    }
                }
            } else {
                let result = supervisor.execute(&spec).await?;
                print_json(&result)?;
            }
        }

        Commands::Pipeline {
            file,
            timeout,
            python,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read pipeline file {}", file.display()))?;
            let specs: Vec<NodeSpec> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid pipeline file {}", file.display()))?;

            let config = EngineConfig::default()
                .with_timeout(Duration::from_secs(timeout))
                .with_python_bin(python);
            let supervisor = Supervisor::new(config);

            let outcome = run_pipeline(&supervisor, &specs).await?;
            info!(status = ?outcome.status, "pipeline finished");
            print_json(&outcome)?;
        }
    }

    Ok(())
}
