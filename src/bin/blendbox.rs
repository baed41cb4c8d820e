use std::{
    fs::File,
    io::{BufReader, Read as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blendbox::{ArtifactStore, BatchReport, DatasetProcessor, ProcessRequest};

#[derive(Parser, Debug)]
#[command(name = "blendbox", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a dataset request and emit the batch report as JSON.
    Process(ProcessArgs),
    /// Print service health as JSON (includes ffmpeg availability).
    Health,
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Upload root the dataset paths are relative to; artifacts are written
    /// beneath it.
    #[arg(long)]
    root: PathBuf,

    /// Request JSON (`{"userId": ..., "data": {"pairs": [...]}}`), or `-` for stdin.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Report output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blendbox=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_process(args),
        Command::Health => cmd_health(),
    }
}

fn read_request_json(path: &Path) -> anyhow::Result<ProcessRequest> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read request from stdin")?;
        return serde_json::from_str(&buf).context("parse request JSON");
    }

    let f = File::open(path).with_context(|| format!("open request '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).context("parse request JSON")
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let request = match read_request_json(&args.in_path) {
        Ok(request) => request,
        Err(err) => {
            // Even envelope failures answer in the report payload shape.
            write_report(args.out.as_deref(), &BatchReport::failed(format!("{err:#}")))?;
            std::process::exit(1);
        }
    };

    let processor = DatasetProcessor::new(ArtifactStore::new(&args.root));
    let report = processor.process_dataset(&request.user_id, &request.data);
    write_report(args.out.as_deref(), &report)
}

fn cmd_health() -> anyhow::Result<()> {
    let health = serde_json::json!({
        "status": "healthy",
        "service": "blendbox",
        "ffmpeg": blendbox::is_ffmpeg_on_path(),
    });
    println!("{health}");
    Ok(())
}

fn write_report(out: Option<&Path>, report: &BatchReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("write report '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
