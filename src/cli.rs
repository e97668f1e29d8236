use std::fs;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::orchestrator::RunOrchestrator;
use crate::realtime::{ChannelSink, Event, RealtimeSink};
use crate::robot::{Axis, PositionStore, Robot, SimulatedDriver};

#[derive(Parser)]
#[command(name = "blocklab")]
#[command(about = "Block-program interpreter for a three-axis stepper rig", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Position file path (overrides config file and env vars)
    #[arg(long, global = true)]
    pub position_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a serialized block program against the simulated rig
    Run {
        /// Path to the program document (JSON)
        program: String,
    },

    /// Print the persisted position
    Position,
}

/// Run the CLI by parsing process arguments.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(path) = &cli.position_file {
        settings.position_file = path.into();
    }

    match cli.command {
        Commands::Run { program } => cmd_run(settings, &program),
        Commands::Position => cmd_position(settings),
    }
}

fn cmd_run(settings: Settings, program: &str) -> Result<()> {
    let document =
        fs::read_to_string(program).with_context(|| format!("reading program {program}"))?;

    let (tx, rx) = mpsc::channel();
    let sink: Arc<dyn RealtimeSink> = Arc::new(ChannelSink::new(tx));
    let printer = thread::spawn(move || {
        for event in rx {
            print_event(&event);
        }
    });

    let robot = Arc::new(Robot::new(
        settings,
        Arc::new(SimulatedDriver::new()),
        Arc::clone(&sink),
    ));
    let orchestrator = RunOrchestrator::new(robot, Arc::clone(&sink), None);
    drop(sink);

    let handle = orchestrator.start(document)?;
    handle.join();

    // Dropping the remaining sink handles closes the channel and ends the
    // printer.
    drop(orchestrator);
    let _ = printer.join();
    Ok(())
}

fn cmd_position(settings: Settings) -> Result<()> {
    let store = PositionStore::load(&settings.position_file);
    println!(
        "X: {}, Y: {}, Z: {}",
        store.get(Axis::X),
        store.get(Axis::Y),
        store.get(Axis::Z)
    );
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::Coords { data } => println!("coords           {data}"),
        Event::Update { data } => println!("update           {data}"),
        Event::ExecutionError {
            error,
            block_id,
            error_code,
        } => {
            let block = block_id.as_deref().unwrap_or("-");
            eprintln!("execution_error  [{error_code}] {error} (block {block})");
        }
    }
}
