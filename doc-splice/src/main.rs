use clap::Parser;
use doc_splice::{
    Operation, PlanError, PlanRequest, PlanResponse, generate_execution_id, read_document,
    relocate, substitute, verify_checksum, write_document,
};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Relocate and substitute marker-delimited blocks in large text documents
#[derive(Parser, Debug)]
#[command(name = "doc-splice")]
#[command(version = "0.1.0")]
#[command(about = "Verified line-range surgery on a single document", long_about = None)]
struct Args {
    /// Document to edit in place
    #[arg(short, long)]
    file: PathBuf,

    /// JSON plan describing the operation (omit to read from stdin)
    #[arg(short, long)]
    plan: Option<PathBuf>,

    /// Output structured JSON instead of human-readable
    #[arg(short, long)]
    json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run every check but leave the document untouched
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Read the plan from a file path or stdin
///
/// Also returns the directory relative replacement files resolve against.
fn read_plan(path: Option<&PathBuf>) -> Result<(PlanRequest, PathBuf), Box<dyn std::error::Error>> {
    let (json_str, base_dir) = if let Some(p) = path {
        let base_dir = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (fs::read_to_string(p)?, base_dir)
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        (buffer, PathBuf::from("."))
    };

    Ok((PlanRequest::from_json(&json_str)?, base_dir))
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let (plan, base_dir) = match read_plan(args.plan.as_ref()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error reading plan: {}", e);
            std::process::exit(1);
        }
    };

    let response = run(&args, plan, &base_dir);
    output_response(&response, args.json, args.output.as_ref());

    if !response.success {
        std::process::exit(1);
    }
}

/// Load, transform, verify and (unless dry-run) write the document
fn run(args: &Args, plan: PlanRequest, base_dir: &Path) -> PlanResponse {
    let execution_id = if plan.execution_id == "auto" {
        generate_execution_id()
    } else {
        plan.execution_id.clone()
    };
    let operation = plan.operation.name();

    let loaded = match read_document(&args.file) {
        Ok(loaded) => loaded,
        Err(e) => {
            return PlanResponse::failure(
                execution_id,
                "FileError",
                format!("Failed to read file '{}': {}", args.file.display(), e),
            )
            .with_operation(operation);
        }
    };
    info!(
        path = %args.file.display(),
        lines = loaded.document.len(),
        bytes = loaded.len,
        checksum = %loaded.checksum,
        "loaded document"
    );

    if let Some(expected) = &plan.expected_checksum {
        if let Err(e) = verify_checksum(&loaded.checksum, expected) {
            warn!(%e, "aborting");
            return PlanResponse::from_splice_error(execution_id, &e).with_operation(operation);
        }
    }

    let outcome = match plan.operation {
        Operation::Relocate(relocation) => relocate(&loaded.document, &relocation)
            .map(|done| (done.document, Outcome::Relocated(done.report))),
        Operation::Substitute(sub_plan) => {
            let substitution = match sub_plan.into_substitution(base_dir) {
                Ok(substitution) => substitution,
                Err(e) => return plan_failure(execution_id, &e).with_operation(operation),
            };
            substitute(&loaded.document, &substitution)
                .map(|done| (done.document, Outcome::Substituted(done.report)))
        }
    };

    let (document, outcome) = match outcome {
        Ok(done) => done,
        Err(e) => {
            warn!(%e, "aborting, document left unchanged");
            return PlanResponse::from_splice_error(execution_id, &e).with_operation(operation);
        }
    };

    let written = if args.dry_run {
        info!("dry run, not writing");
        false
    } else {
        if let Err(e) = write_document(&args.file, &document) {
            return PlanResponse::failure(
                execution_id,
                "FileError",
                format!("Failed to write file '{}': {}", args.file.display(), e),
            )
            .with_operation(operation);
        }
        true
    };

    match outcome {
        Outcome::Relocated(report) => PlanResponse::relocated(execution_id, &report, written),
        Outcome::Substituted(report) => PlanResponse::substituted(execution_id, &report, written),
    }
}

enum Outcome {
    Relocated(doc_splice::RelocationReport),
    Substituted(doc_splice::SubstitutionReport),
}

fn plan_failure(execution_id: String, err: &PlanError) -> PlanResponse {
    let kind = match err {
        PlanError::File(_) => "FileError",
        PlanError::Parse(_) | PlanError::Replacement(_) => "PlanError",
    };
    PlanResponse::failure(execution_id, kind, err.to_string())
}

/// Format and output the response
fn output_response(response: &PlanResponse, json_mode: bool, output_path: Option<&PathBuf>) {
    let output = if json_mode {
        serde_json::to_string_pretty(response).unwrap_or_else(|_| {
            r#"{"error": "Failed to serialize response"}"#.to_string()
        })
    } else if response.success {
        human_summary(response)
    } else {
        format!(
            "Error ({}): {}",
            response.error_kind.as_deref().unwrap_or("Unknown"),
            response.error.as_deref().unwrap_or("Unknown error")
        )
    };

    if let Some(path) = output_path {
        if let Err(e) = fs::write(path, &output) {
            eprintln!("Failed to write output to '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    } else {
        println!("{}", output);
    }
}

fn human_summary(response: &PlanResponse) -> String {
    let mut lines = Vec::new();

    match response.lines_moved {
        Some(moved) => lines.push(format!("Relocated {} line(s)", moved)),
        None => lines.push("Substituted block".to_string()),
    }
    if let (Some((first, last)), Some(to)) = (response.moved_from, response.moved_to) {
        lines.push(format!("Moved from lines {}-{} to line {}", first, last, to));
    }
    if let (Some(start), Some(end)) = (response.start_marker_line, response.end_marker_line) {
        lines.push(format!("Block markers at lines {} and {}", start, end));
    }
    if let (Some(before), Some(after)) = (response.lines_before, response.lines_after) {
        lines.push(format!("Lines: {} -> {}", before, after));
    }
    if let Some(checksum) = &response.checksum_after {
        lines.push(format!("Final checksum: {}", checksum));
    }
    if !response.written {
        lines.push("Dry run: document not written".to_string());
    }

    lines.join("\n")
}
