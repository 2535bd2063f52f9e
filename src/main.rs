//! Xyeshark - Midea Xye bus to UDP bridge
//!
//! Reads the RS-485 bus, cuts it into frames and forwards each frame as an
//! `HVAC_shark` datagram.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use xyeshark_core::cli::{init_tracing, print_exit_codes, CliResult};
use xyeshark_core::config::{self, AppConfig};
use xyeshark_core::core::transport::list_ports;
use xyeshark_core::{
    Bridge, BridgeStats, ByteSource, CaptureLog, FrameDecoder, FrameLogs, FrameSink,
    HexFrameLog, ReplaySource, SerialSource, TracingFrameLog, UdpBroadcaster,
};

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format for scripting
    Json,
}

/// Xyeshark CLI
#[derive(Parser, Debug)]
#[command(
    name = "xyeshark",
    version,
    about = "Midea Xye RS-485 bus to UDP bridge",
    long_about = None
)]
struct Cli {
    /// Output format for summaries and listings
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only, no frame trace)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "XYESHARK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Destination overrides shared by `run` and `replay`
#[derive(clap::Args, Debug)]
struct UdpArgs {
    /// UDP destination host
    #[arg(long)]
    udp_host: Option<String>,

    /// UDP destination port
    #[arg(long)]
    udp_port: Option<u16>,

    /// Append frames to a capture file
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Do not print frames on stdout
    #[arg(long)]
    no_hex: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bridge a serial port to UDP
    Run {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        #[command(flatten)]
        udp: UdpArgs,
    },

    /// List available serial ports
    ListPorts {
        /// Show detailed info
        #[arg(short, long)]
        detailed: bool,
    },

    /// Feed a capture file through the decoder
    Replay {
        /// Capture file (hex lines) or raw dump with --raw
        file: PathBuf,

        /// Treat the file as raw bus bytes
        #[arg(long)]
        raw: bool,

        /// Decode only, send nothing
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        udp: UdpArgs,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the exit code table
    ExitCodes,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match execute(&cli) {
        Ok(()) => CliResult::success(),
        Err(e) => CliResult::from_error(&e),
    };

    if let CliResult::Error(_, msg) = &result {
        eprintln!("Error: {}", msg);
    }
    result.to_exit_code()
}

fn execute(cli: &Cli) -> anyhow::Result<()> {
    // Commands that must work without a readable config
    match &cli.command {
        Commands::ExitCodes => {
            print_exit_codes();
            return Ok(());
        }
        Commands::Config { action } => return handle_config(cli, action),
        _ => {}
    }

    let config = load_config(cli)?;
    let _guard = init_tracing(&config.logging, cli.verbose, cli.quiet)?;

    tracing::debug!("Starting Xyeshark v{}", xyeshark_core::VERSION);

    match &cli.command {
        Commands::Run { port, baud, udp } => run_bridge(cli, config, port.as_deref(), *baud, udp),
        Commands::ListPorts { detailed } => show_ports(cli, *detailed),
        Commands::Replay {
            file,
            raw,
            dry_run,
            udp,
        } => replay(cli, config, file, *raw, *dry_run, udp),
        Commands::Config { .. } | Commands::ExitCodes => Ok(()),
    }
}

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => config::config_path().ok_or_else(|| config::ConfigError::NoConfigDir.into()),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

fn handle_config(cli: &Cli, action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", config_path(cli)?.display());
        }
        ConfigAction::Show => {
            let config = load_config(cli)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Text => print!("{}", config.to_toml()?),
            }
        }
        ConfigAction::Init { force } => {
            let path = config_path(cli)?;
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let mut defaults = AppConfig::default();
            defaults.logging.log_dir = config::log_dir();
            defaults.save_to(&path)?;
            if !cli.quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

/// Fold command line overrides into the config.
///
/// The hex trace shares stdout with the JSON summary, so JSON output turns it off.
fn apply_udp_args(config: &mut AppConfig, udp: &UdpArgs, cli: &Cli) {
    if let Some(host) = &udp.udp_host {
        config.broadcast.host.clone_from(host);
    }
    if let Some(port) = udp.udp_port {
        config.broadcast.port = port;
    }
    if let Some(capture) = &udp.capture {
        config.logging.capture_file = Some(capture.clone());
    }
    if udp.no_hex || cli.quiet || cli.format == OutputFormat::Json {
        config.logging.hex_stdout = false;
    }
}

fn frame_logs(config: &AppConfig) -> anyhow::Result<FrameLogs> {
    let mut logs = FrameLogs::new().with(TracingFrameLog);
    if config.logging.hex_stdout {
        logs = logs.with(HexFrameLog::stdout());
    }
    if let Some(path) = &config.logging.capture_file {
        logs = logs.with(CaptureLog::open(path)?);
    }
    Ok(logs)
}

fn run_until_interrupted<S, K>(
    mut bridge: Bridge<S, K, FrameLogs>,
) -> anyhow::Result<(BridgeStats, K)>
where
    S: ByteSource,
    K: FrameSink,
{
    let running = bridge.stop_handle();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })?;

    let stats = bridge.run()?;
    let (_, _, sink, _) = bridge.into_parts();
    Ok((stats, sink))
}

fn run_bridge(
    cli: &Cli,
    mut config: AppConfig,
    port: Option<&str>,
    baud: Option<u32>,
    udp: &UdpArgs,
) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.serial.port = port.to_string();
    }
    if let Some(baud) = baud {
        config.serial.baud_rate = baud;
    }
    apply_udp_args(&mut config, udp, cli);
    config.validate()?;

    let source = SerialSource::open(config.serial.clone())?;
    let decoder = FrameDecoder::new(config.decoder)?;
    let sink = UdpBroadcaster::new(&config.broadcast)?;

    if !cli.quiet {
        eprintln!("Connected to {}", source.connection_info());
        eprintln!("Sending UDP packets to {}", sink.destination());
        eprintln!("Press Ctrl+C to exit");
    }

    let bridge = Bridge::new(source, decoder, sink, frame_logs(&config)?);
    let (stats, sink) = run_until_interrupted(bridge)?;
    print_summary(cli, &stats, Some(&sink));
    Ok(())
}

fn replay(
    cli: &Cli,
    mut config: AppConfig,
    file: &Path,
    raw: bool,
    dry_run: bool,
    udp: &UdpArgs,
) -> anyhow::Result<()> {
    apply_udp_args(&mut config, udp, cli);
    config.validate()?;

    let source = ReplaySource::open(file, raw)?;
    let decoder = FrameDecoder::new(config.decoder)?;
    let logs = frame_logs(&config)?;

    if dry_run {
        let (stats, ()) = run_until_interrupted(Bridge::new(source, decoder, (), logs))?;
        print_summary(cli, &stats, None);
    } else {
        let sink = UdpBroadcaster::new(&config.broadcast)?;
        let (stats, sink) = run_until_interrupted(Bridge::new(source, decoder, sink, logs))?;
        print_summary(cli, &stats, Some(&sink));
    }
    Ok(())
}

fn print_summary(cli: &Cli, stats: &BridgeStats, sink: Option<&UdpBroadcaster>) {
    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "bridge": stats,
                "sender": sink.map(UdpBroadcaster::stats),
            });
            println!("{}", json);
        }
        OutputFormat::Text => {
            if cli.quiet {
                return;
            }
            let d = &stats.decoder;
            eprintln!(
                "{} frames ({} complete, {} restarted, {} overflowed), {} bytes read, {} dropped while idle, {:.1}s",
                d.frames_emitted(),
                d.frames_complete,
                d.frames_restarted,
                d.frames_overflowed,
                stats.source.bytes_read,
                d.bytes_dropped,
                stats.elapsed.as_secs_f64(),
            );
            if let Some(sink) = sink {
                let s = sink.stats();
                eprintln!(
                    "{} datagrams sent to {} ({} bytes, {} errors)",
                    s.datagrams_sent,
                    sink.destination(),
                    s.bytes_sent,
                    s.errors
                );
            }
        }
    }
}

fn show_ports(cli: &Cli, detailed: bool) -> anyhow::Result<()> {
    let ports = list_ports()?;

    match cli.format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = ports
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.port_name,
                        "type": format!("{:?}", p.port_type)
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            if ports.is_empty() {
                if !cli.quiet {
                    println!("No serial ports found.");
                }
                return Ok(());
            }
            if detailed {
                println!("Available Serial Ports:");
                println!("{:-<60}", "");
                for port in &ports {
                    println!("  {} [{:?}]", port.port_name, port.port_type);
                }
            } else {
                for port in &ports {
                    println!("{}", port.port_name);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay_config(args: &[&str]) -> AppConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut config = AppConfig::default();
        match &cli.command {
            Commands::Replay { udp, .. } => apply_udp_args(&mut config, udp, &cli),
            other => panic!("unexpected command {:?}", other),
        }
        config
    }

    #[test]
    fn test_hex_trace_on_by_default() {
        let config = replay_config(&["xyeshark", "replay", "capture.txt"]);
        assert!(config.logging.hex_stdout);
    }

    #[test]
    fn test_json_output_disables_hex_trace() {
        let config = replay_config(&["xyeshark", "--format", "json", "replay", "capture.txt"]);
        assert!(!config.logging.hex_stdout);

        let config = replay_config(&["xyeshark", "replay", "capture.txt", "-f", "json"]);
        assert!(!config.logging.hex_stdout);
    }

    #[test]
    fn test_udp_overrides() {
        let config = replay_config(&[
            "xyeshark",
            "replay",
            "capture.txt",
            "--udp-host",
            "192.168.1.255",
            "--udp-port",
            "22223",
            "--no-hex",
        ]);
        assert_eq!(config.broadcast.host, "192.168.1.255");
        assert_eq!(config.broadcast.port, 22223);
        assert!(!config.logging.hex_stdout);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
