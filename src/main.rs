use std::path::Path;
use std::process::ExitCode;

use genflow::dsl::{parse_flow, FlowFormat};
use genflow::Graph;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (command, path) = match args.as_slice() {
        [_, command, path] if command == "validate" || command == "plan" => {
            (command.as_str(), path.as_str())
        }
        _ => {
            eprintln!("Usage: genflow <validate|plan> <flow.{{yaml,json,toml}}>");
            return ExitCode::from(2);
        }
    };

    let format = match format_for(path) {
        Some(format) => format,
        None => {
            eprintln!("error: unrecognized flow file extension: {}", path);
            return ExitCode::from(2);
        }
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let flow = match parse_flow(&content, format) {
        Ok(flow) => flow,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Structural checks only: collaborators and schemas are registered by the
    // embedding program, not known to the CLI.
    let graph = match Graph::build_structural(&flow) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "ok: {} nodes, {} run inputs",
        graph.node_count(),
        graph.run_inputs.len()
    );

    if command == "plan" {
        for (i, batch) in graph.topological_batches().iter().enumerate() {
            println!("batch {}: {}", i + 1, batch.join(", "));
        }
    }

    ExitCode::SUCCESS
}

fn format_for(path: &str) -> Option<FlowFormat> {
    match Path::new(path).extension()?.to_str()? {
        "yaml" | "yml" => Some(FlowFormat::Yaml),
        "json" => Some(FlowFormat::Json),
        "toml" => Some(FlowFormat::Toml),
        _ => None,
    }
}
