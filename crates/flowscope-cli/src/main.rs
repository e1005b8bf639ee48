//! DFM exploration CLI.
//!
//! Provides the `flowscope` binary with subcommands for working with
//! discovered directly-follows multigraphs. `filter` applies the threshold
//! filter to a document file and prints the layout input for the drawing
//! collaborator; `fetch` polls a computation endpoint until the discovery
//! task finishes and prints the resulting document.
//!
//! Both subcommands print machine-readable JSON to stdout and diagnostics
//! to stderr. The API base URL falls back to the `FLOWSCOPE_API_URL`
//! environment variable, then to localhost.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use flowscope_client::{document_poller, DfmQuery, TaskState};
use flowscope_core::highlight;
use flowscope_core::{filter_graph, DfmDocument, PositionCache, RenderGraph};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// DFM exploration tools.
#[derive(Parser)]
#[command(name = "flowscope", about = "Threshold-driven DFM exploration tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Filter a document into a renderable graph.
    Filter {
        /// Path to the document JSON file.
        #[arg(short, long)]
        document: PathBuf,

        /// Detail level in percent (0..=100), divided by 100 internally.
        #[arg(short = 'l', long, default_value_t = 100)]
        detail: u32,

        /// Object types to show (repeatable). Defaults to every type in the
        /// document.
        #[arg(short, long = "object-type")]
        object_types: Vec<String>,

        /// Edge highlighting: none, linear, logarithmic, narrow-logarithmic.
        #[arg(long, default_value = "none")]
        highlighting: String,
    },
    /// Poll a computation endpoint until the discovery task finishes and
    /// print the document.
    Fetch {
        /// Base URL of the computation API (default: $FLOWSCOPE_API_URL,
        /// then localhost).
        #[arg(long)]
        api_url: Option<String>,

        /// Name of the event log to discover the DFM for.
        #[arg(short, long)]
        ocel: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Filter {
            document,
            detail,
            object_types,
            highlighting,
        } => run_filter(&document, detail, object_types, &highlighting),
        Commands::Fetch { api_url, ocel } => {
            let api_url = api_url
                .or_else(|| std::env::var("FLOWSCOPE_API_URL").ok())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string());
            run_fetch(&api_url, ocel).await
        }
    };
    process::exit(exit_code);
}

/// Execute the filter subcommand.
///
/// Returns exit code: 0 = success, 1 = argument error,
/// 2 = document validation error, 3 = I/O error.
fn run_filter(
    document_path: &PathBuf,
    detail: u32,
    object_types: Vec<String>,
    highlighting: &str,
) -> i32 {
    if detail > 100 {
        eprintln!("Error: --detail must be in 0..=100, got {detail}");
        return 1;
    }
    // The detail control is integer percent; the core works on [0, 1].
    let threshold = f64::from(detail) / 100.0;

    let bytes = match std::fs::read(document_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", document_path.display(), e);
            return 3;
        }
    };

    let document = match DfmDocument::from_json(&bytes) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: invalid document: {e}");
            return 2;
        }
    };

    let selection = if object_types.is_empty() {
        document.object_types().map(str::to_string).collect()
    } else {
        object_types
    };

    // No layout collaborator here, so positions start empty.
    let mut positions = PositionCache::new();
    positions.sync_document(&document);

    let graph = match highlighting {
        "none" => filter_graph(&document, threshold, &selection, &highlight::flat(), &positions),
        "linear" => filter_graph(
            &document,
            threshold,
            &selection,
            &highlight::linear_trace_count(),
            &positions,
        ),
        "logarithmic" => filter_graph(
            &document,
            threshold,
            &selection,
            &highlight::log_trace_count(),
            &positions,
        ),
        "narrow-logarithmic" => filter_graph(
            &document,
            threshold,
            &selection,
            &highlight::narrow_log_trace_count(),
            &positions,
        ),
        other => {
            eprintln!(
                "Error: unknown highlighting mode '{other}', expected \
                 none/linear/logarithmic/narrow-logarithmic"
            );
            return 1;
        }
    };

    print_graph(&graph);
    0
}

fn print_graph(graph: &RenderGraph) {
    let output = serde_json::json!({
        "graph": graph.to_layout_input(),
        "legend": graph.legend,
    });
    let json = serde_json::to_string_pretty(&output)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize graph: {}\"}}", e));
    println!("{json}");
}

/// Execute the fetch subcommand.
///
/// Returns exit code: 0 = success, 3 = network or task failure.
async fn run_fetch(api_url: &str, ocel: String) -> i32 {
    let query = DfmQuery::new(ocel);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let poller = document_poller(reqwest::Client::new(), api_url, &query, move |state| {
        let _ = tx.send(state.clone());
    });
    let mut poller = match poller {
        Ok(poller) => poller,
        Err(e) => {
            eprintln!("Error: {e}");
            return 3;
        }
    };

    tracing::info!(api_url, endpoint = DfmQuery::ENDPOINT, "polling discovery task");
    poller.start();

    while let Some(state) = rx.recv().await {
        match state {
            TaskState::Running {
                preliminary: Some(preliminary),
            } => {
                tracing::info!(
                    nodes = preliminary.node_count(),
                    "received preliminary document"
                );
            }
            TaskState::Done { result } => {
                let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                    format!("{{\"error\": \"failed to serialize document: {}\"}}", e)
                });
                println!("{json}");
                return 0;
            }
            TaskState::Failed => {
                eprintln!("Error: discovery task failed");
                return 3;
            }
            _ => {}
        }
    }

    eprintln!("Error: poller stopped without a terminal state");
    3
}
