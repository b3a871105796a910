//! Convert V8 CPU profiles into a Chrome trace for DevTools.
//!
//! This binary reads one or more `.cpuprofile` files (or directories of them,
//! as written by `node --cpu-prof`) and writes a single trace document that
//! the DevTools Performance panel renders as a flame chart.
//!
//! # Usage
//!
//! ```bash
//! cpuprof_to_trace CPU.20250601.191007.42154.0.001.cpuprofile -o Trace.json
//! cpuprof_to_trace ./profiles --chunk-size 1000 --run-tasks
//! RUST_LOG=debug cpuprof_to_trace ./profiles > Trace.json
//! ```

use clap::Parser;
use cpuprof_trace::ids::IdScheme;
use cpuprof_trace::loader;
use cpuprof_trace::session::{SessionBuilder, SessionOptions};
use cpuprof_trace::select_primary;
use ctef::TraceWriter;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cpuprof_to_trace")]
#[command(about = "Convert V8 CPU profiles into a Chrome trace for DevTools")]
#[command(version)]
struct Args {
    /// Input .cpuprofile files or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output trace file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// URL shown for the synthetic page (defaults to the primary profile's path)
    #[arg(long)]
    url: Option<String>,

    /// Maximum samples per ProfileChunk event
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    chunk_size: Option<usize>,

    /// Emit a RunTask slice spanning each profile
    #[arg(long)]
    run_tasks: bool,

    /// Use collision-free ids instead of the legacy pid/tid concatenation
    #[arg(long)]
    packed_ids: bool,

    /// Label for every process lane
    #[arg(long)]
    process_name: Option<String>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            url: self.url.clone(),
            id_scheme: if self.packed_ids {
                IdScheme::Packed
            } else {
                IdScheme::Concatenated
            },
            chunk_size: self.chunk_size,
            run_tasks: self.run_tasks,
            process_name: self.process_name.clone(),
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let profiles = loader::load_all(&args.inputs)?;
    let primary = select_primary(&profiles)?;
    info!(
        profiles = profiles.len(),
        pid = primary.pid,
        tid = primary.tid,
        "loaded CPU profiles"
    );

    let document = SessionBuilder::new(args.session_options())
        .extend(&profiles)
        .build()?;

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).map_err(|e| {
            format!("Failed to create output file '{}': {}", path.display(), e)
        })?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = TraceWriter::new(BufWriter::new(output)).pretty(args.pretty);
    writer.write_document(&document)?;

    info!(
        events = document.trace_events.len(),
        output = %args
            .output
            .as_ref()
            .map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string()),
        "wrote trace"
    );

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_size_is_rejected() {
        let result = Args::try_parse_from(["cpuprof_to_trace", "a.cpuprofile", "--chunk-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn chunk_size_reaches_options() {
        let args =
            Args::try_parse_from(["cpuprof_to_trace", "a.cpuprofile", "--chunk-size", "500"])
                .unwrap();
        assert_eq!(args.session_options().chunk_size, Some(500));
    }

    #[test]
    fn packed_ids_flag_selects_scheme() {
        let args = Args::try_parse_from(["cpuprof_to_trace", "a.cpuprofile", "--packed-ids"]).unwrap();
        assert_eq!(args.session_options().id_scheme, IdScheme::Packed);
    }
}
