//! Command-line driver for the resolution engine
//!
//! Loads a host graph from a JSON file, runs one resolution pass, and
//! prints the render overlay (default) or the augmented execution payload.

use nodecast::{BroadcastSettings, NodeGraph, ResolutionController};
use std::process::ExitCode;

const USAGE: &str = "usage: nodecast <graph.json> [--payload] [--details] [--no-loop-check]";

fn main() -> ExitCode {
    env_logger::init();

    let mut graph_path: Option<String> = None;
    let mut emit_payload = false;
    let mut settings = BroadcastSettings::default();

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--payload" => emit_payload = true,
            "--details" => settings.show_details = true,
            "--no-loop-check" => settings.check_loops = false,
            "--help" | "-h" => {
                println!("{}", USAGE);
                return ExitCode::SUCCESS;
            }
            _ if graph_path.is_none() => graph_path = Some(arg),
            _ => {
                eprintln!("{}", USAGE);
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(graph_path) = graph_path else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    match run(&graph_path, emit_payload, settings) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("nodecast: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(
    graph_path: &str,
    emit_payload: bool,
    settings: BroadcastSettings,
) -> Result<String, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(graph_path)?;
    let graph: NodeGraph = serde_json::from_str(&text)?;
    log::debug!(
        "loaded graph with {} nodes, {} connections",
        graph.nodes.len(),
        graph.connections.len()
    );

    let mut controller = ResolutionController::new(settings);
    if emit_payload {
        let payload = controller.build_execution_payload(&graph)?;
        Ok(serde_json::to_string_pretty(&payload)?)
    } else {
        let overlay = controller.query_for_render(&graph);
        Ok(serde_json::to_string_pretty(&overlay)?)
    }
}
