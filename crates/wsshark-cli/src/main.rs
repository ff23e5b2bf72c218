use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use tracing_subscriber::EnvFilter;
use wsshark_core::{DEFAULT_ARCHIVE_DIR, DEFAULT_SNAPLEN, Report, SnifferConfig};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("WSSHARK_BUILD_COMMIT"),
    " ",
    env!("WSSHARK_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "wsshark")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Passive WebSocket session sniffer: handshake detection, frame decoding, per-session pcapng archives.",
    long_about = None,
    after_help = "Examples:\n  wsshark pcap analyse capture.pcapng -o report.json\n  wsshark pcap analyze 'dumps/*.pcap' --stdout --archive-dir sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on PCAP/PCAPNG inputs.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
    /// Sniff a network interface until interrupted.
    #[cfg(feature = "live")]
    Live(LiveArgs),
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Replay a capture, archive every closed WebSocket session and write a JSON report.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  wsshark pcap analyse capture.pcapng -o report.json\n  wsshark pcap analyze capture.pcap --stdout --pretty"
    )]
    Analyse(AnalyseArgs),
}

#[derive(Args, Debug)]
struct AnalyseArgs {
    /// Path (or glob matching one file) to a .pcap or .pcapng file
    input: PathBuf,

    /// Output report path (JSON)
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Exit with a non-zero code if frame anomalies or archive failures occurred
    #[arg(long)]
    strict: bool,

    /// List sessions after analysis
    #[arg(long)]
    list_sessions: bool,

    #[command(flatten)]
    sniffer: SnifferArgs,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[cfg(feature = "live")]
#[derive(Args, Debug)]
struct LiveArgs {
    /// Interface to capture on
    #[arg(short, long, required_unless_present = "list")]
    interface: Option<String>,

    /// List capture interfaces and exit
    #[arg(long, conflicts_with = "interface")]
    list: bool,

    #[command(flatten)]
    sniffer: SnifferArgs,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[derive(Args, Debug)]
struct SnifferArgs {
    /// Directory receiving one .pcapng archive per closed session
    #[arg(long, default_value = DEFAULT_ARCHIVE_DIR)]
    archive_dir: PathBuf,

    /// Maximum frame size recorded in archives
    #[arg(long, default_value_t = DEFAULT_SNAPLEN, value_parser = clap::value_parser!(u32).range(1..=262_144))]
    snaplen: u32,

    /// Log every TCP packet (debug level)
    #[arg(long)]
    log_traffic: bool,
}

impl SnifferArgs {
    fn config(&self) -> SnifferConfig {
        SnifferConfig {
            archive_dir: self.archive_dir.clone(),
            snaplen: self.snaplen,
            log_traffic: self.log_traffic,
            retain_sessions: true,
        }
    }
}

#[derive(Args, Debug)]
struct LoggingArgs {
    /// Suppress non-error output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log per-frame details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pcap { command } => match command {
            PcapCommands::Analyse(args) => {
                init_tracing(&args.logging, args.sniffer.log_traffic);
                cmd_pcap_analyse(args)
            }
        },
        #[cfg(feature = "live")]
        Commands::Live(args) => {
            init_tracing(&args.logging, args.sniffer.log_traffic);
            cmd_live(args)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

/// Events go to stderr so `--stdout` keeps a clean JSON stream.
fn init_tracing(logging: &LoggingArgs, log_traffic: bool) {
    let filter = if logging.quiet {
        EnvFilter::new("warn")
    } else if logging.verbose || log_traffic {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_pcap_analyse(args: AnalyseArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report = if args.stdout {
        None
    } else {
        Some(args.report.clone().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        ensure_distinct_from_input(report_path, &input_abs)?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", args.input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }

    let config = args.sniffer.config();
    let rep = wsshark_core::analyze_pcap_file(&resolved_input, &config)
        .context("PCAP/PCAPNG analysis failed")?;
    let json = serialize_report(&rep, args.pretty, args.compact)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !args.logging.quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if args.list_sessions && !args.logging.quiet {
        print_sessions(&rep);
    }
    if args.strict && has_problems(&rep) {
        return Err(CliError::new(
            "frame anomalies or archive failures detected",
            Some("use --list-sessions to inspect".to_string()),
        ));
    }
    Ok(())
}

#[cfg(feature = "live")]
fn cmd_live(args: LiveArgs) -> Result<(), CliError> {
    use std::rc::Rc;

    use wsshark_core::{ArchiveWriter, InputInfo, LiveSource, PcapngArchiveWriter};

    if args.list {
        let interfaces = wsshark_core::list_interfaces()
            .map_err(|err| CliError::new(err.to_string(), None))?;
        for (name, description) in interfaces {
            match description {
                Some(description) => println!("{name}\t{description}"),
                None => println!("{name}"),
            }
        }
        return Ok(());
    }

    let interface = args.interface.ok_or_else(|| {
        CliError::new(
            "missing interface",
            Some("use --interface NAME, or --list to see candidates".to_string()),
        )
    })?;
    let config = SnifferConfig {
        retain_sessions: false,
        ..args.sniffer.config()
    };
    let source = LiveSource::open(&interface, config.snaplen).map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("live capture usually needs root or CAP_NET_RAW".to_string()),
        )
    })?;
    let archive: Rc<dyn ArchiveWriter> = Rc::new(PcapngArchiveWriter::new(&config.archive_dir));
    let input = InputInfo {
        path: format!("live:{interface}"),
        bytes: 0,
    };
    wsshark_core::analyze_source(input, source, &config, archive)
        .context("live capture failed")?;
    Ok(())
}

fn ensure_distinct_from_input(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_abs = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    if let Some(report_dir) = report_abs {
        let report_target = report_dir.join(
            report_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
        );
        if report_target == input_abs {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn has_problems(rep: &Report) -> bool {
    rep.analyzer_errors > 0 || rep.sessions.iter().any(|session| session.anomalies > 0)
}

fn print_sessions(rep: &Report) {
    eprintln!("Sessions:");
    for session in &rep.sessions {
        let close = session
            .close_code
            .map(|code| format!(" close={code}"))
            .unwrap_or_default();
        eprintln!(
            "  {} -> {} {} frames={} anomalies={}{}",
            session.client, session.server, session.state, session.frames, session.anomalies, close
        );
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        let hint = "pass a single capture file, or run once per file".to_string();
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches)",
            pattern,
            matches.len()
        );
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        message.push_str("; matches: ");
        message.push_str(&listed);
        if matches.len() > 3 {
            message.push_str(", ...");
        }
        return Err(CliError::new(message, Some(hint)));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
