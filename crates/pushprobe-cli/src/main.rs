//! Command-line runner for the pushprobe rich push scenarios.
//!
//! Drives an attached Android device through the notification, inbox and
//! preferences scenarios, and exposes the building blocks (sending a push,
//! listing devices, dumping the window) for debugging a failing run.
//!
//! # Usage
//!
//! ```bash
//! # Run every scenario on the only attached device
//! pushprobe run
//!
//! # Run selected scenarios on a specific device, JSON report on stdout
//! pushprobe --serial emulator-5554 run -S inbox -S preferences --format json
//!
//! # Run against a device reachable over adb-over-TCP
//! pushprobe --tcp 192.168.1.20:5555 run
//!
//! # Send a rich push to every device, or to a tag segment
//! pushprobe send
//! pushprobe send --segment home
//!
//! # List attached devices
//! pushprobe devices
//!
//! # Show the interesting views of the current window, or the raw tree
//! pushprobe dump
//! pushprobe dump --full
//!
//! # Store push credentials in ~/.pushprobe/config.json
//! pushprobe config set-credentials --app-key KEY --master-secret SECRET
//! pushprobe config show
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pushprobe_core::adb::Adb;
use pushprobe_core::config::{logs_dir, ProbeConfig};
use pushprobe_core::device::Device;
use pushprobe_core::driver::{DriverConfig, DriverError};
use pushprobe_core::element::UiNode;
use pushprobe_core::push::{AirshipSender, Audience, DeliveryError, PushSender};
use pushprobe_core::report::RunReport;
use pushprobe_core::scenario::{ScenarioContext, ScenarioKind, Suite};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const RUN_LOG_FILENAME: &str = "pushprobe-run.log";
const ADB: &str = "adb";

/// Command-line runner for the pushprobe rich push scenarios.
#[derive(Parser)]
#[command(name = "pushprobe")]
#[command(about = "End-to-end UI checks for a rich push inbox on Android")]
#[command(version)]
struct Cli {
    /// adb serial of the device under test
    #[arg(short, long, global = true, env = "ANDROID_SERIAL")]
    serial: Option<String>,

    /// Connect to the device over adb-over-TCP (HOST:PORT), overriding --serial
    #[arg(long, global = true, value_name = "HOST:PORT", value_parser = parse_tcp_endpoint)]
    tcp: Option<(String, u16)>,

    /// Base URL of the push API
    #[arg(long, global = true, env = "PUSHPROBE_API_URL")]
    api_url: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run scenarios against the device
    Run {
        /// Scenario to run (notification, inbox, preferences); repeatable.
        /// Runs all three when omitted.
        #[arg(short = 'S', long = "scenario")]
        scenarios: Vec<ScenarioKind>,
    },

    /// Send one rich push
    Send {
        /// Tag segment to target instead of every device
        #[arg(long)]
        segment: Option<String>,
    },

    /// List attached devices
    Devices,

    /// Dump the current window
    Dump {
        /// Output the full node tree as JSON
        #[arg(long)]
        full: bool,
    },

    /// Show or edit the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Store the push API credentials
    SetCredentials {
        /// Application key
        #[arg(long)]
        app_key: String,
        /// Master secret
        #[arg(long)]
        master_secret: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(matches!(cli.command, Command::Run { .. }));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Logs to stderr at `warn` unless `RUST_LOG` says otherwise. Suite runs
/// also keep an `info` log in `~/.pushprobe/logs/`.
fn init_logging(log_to_file: bool) {
    let stderr = fmt::layer().with_writer(std::io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    );
    let file = log_to_file.then(|| {
        fmt::layer()
            .with_writer(tracing_appender::rolling::never(logs_dir(), RUN_LOG_FILENAME))
            .with_ansi(false)
            .with_filter(EnvFilter::new("info"))
    });
    tracing_subscriber::registry().with(stderr).with(file).init();
}

#[derive(Debug)]
enum CliError {
    ScenarioFailed(String),
    Device(String),
    Config(String),
    Delivery(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::ScenarioFailed(_) => ExitCode::from(1),
            CliError::Device(_) => ExitCode::from(2),
            CliError::Config(_) => ExitCode::from(3),
            CliError::Delivery(_) => ExitCode::from(4),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::ScenarioFailed(msg) => write!(f, "Scenario failed: {}", msg),
            CliError::Device(msg) => write!(f, "Device error: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Delivery(msg) => write!(f, "Delivery error: {}", msg),
        }
    }
}

impl From<DeliveryError> for CliError {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::MissingCredentials => CliError::Config(format!(
                "{} (run `pushprobe config set-credentials` or set PUSHPROBE_APP_KEY and PUSHPROBE_MASTER_SECRET)",
                e
            )),
            other => CliError::Delivery(other.to_string()),
        }
    }
}

impl From<DriverError> for CliError {
    fn from(e: DriverError) -> Self {
        CliError::Device(e.to_string())
    }
}

/// Stored configuration with environment and flag overrides applied.
fn effective_config(cli: &Cli) -> ProbeConfig {
    let mut config = ProbeConfig::load().with_env_overrides();
    if let Some(serial) = &cli.serial {
        config.device_serial = Some(serial.clone());
    }
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    config
}

/// Parses a `HOST:PORT` adb-over-TCP endpoint.
fn parse_tcp_endpoint(value: &str) -> Result<(String, u16), String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got '{}'", value))?;
    if host.is_empty() {
        return Err(format!("missing host in '{}'", value));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {}", port, e))?;
    Ok((host.to_string(), port))
}

/// The device backend selected by the flags and configuration.
fn driver_config(cli: &Cli, config: &ProbeConfig) -> DriverConfig {
    match &cli.tcp {
        Some((host, port)) => DriverConfig::AdbTcp {
            host: host.clone(),
            port: *port,
        },
        None => DriverConfig::Adb {
            serial: config.device_serial.clone(),
        },
    }
}

/// How the device is named in reports.
fn device_label(cli: &Cli, config: &ProbeConfig) -> Option<String> {
    match &cli.tcp {
        Some((host, port)) => Some(format!("{}:{}", host, port)),
        None => config.device_serial.clone(),
    }
}

async fn connect(cli: &Cli, config: &ProbeConfig) -> Result<Device, CliError> {
    let device = Device::from_config_connected(driver_config(cli, config), config.timings).await?;
    Ok(device)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Config(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = effective_config(&cli);

    match &cli.command {
        Command::Run { scenarios } => run_suite(&cli, config, scenarios.clone()).await,
        Command::Send { segment } => send_push(&cli, &config, segment.as_deref()).await,
        Command::Devices => list_devices(&cli).await,
        Command::Dump { full } => dump_window(&cli, &config, *full).await,
        Command::Config { action } => match action {
            ConfigCommand::Show => show_config(&cli, &config),
            ConfigCommand::SetCredentials {
                app_key,
                master_secret,
            } => set_credentials(app_key, master_secret),
        },
    }
}

async fn run_suite(
    cli: &Cli,
    config: ProbeConfig,
    scenarios: Vec<ScenarioKind>,
) -> Result<(), CliError> {
    let sender = AirshipSender::from_config(&config)?;
    let device = connect(cli, &config).await?;
    let ctx = ScenarioContext::from_config(device, Arc::new(sender), &config);

    let suite = Suite::new(ctx)
        .with_scenarios(scenarios)
        .with_device_label(device_label(cli, &config));
    info!(scenarios = ?suite.scenarios(), "starting run");
    let report = suite.run().await;

    let history = RunReport::default_path();
    if let Err(e) = report.append_to(&history) {
        warn!(path = %history.display(), error = %e, "failed to record run");
    }

    if cli.format == OutputFormat::Json {
        print_json(&report)?;
    } else {
        print!("{}", report.to_text());
        if let Some(finished) = report.finished_at {
            let local = finished.with_timezone(&chrono::Local);
            eprintln!("Finished at {}, history in {}", local.format("%Y-%m-%d %H:%M:%S"), history.display());
        }
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenarioFailed(format!(
            "{} of {} scenarios failed",
            report.failed_count(),
            report.scenarios.len()
        )))
    }
}

async fn send_push(cli: &Cli, config: &ProbeConfig, segment: Option<&str>) -> Result<(), CliError> {
    let sender = AirshipSender::from_config(config)?;
    let audience = Audience::from_segment(segment);
    sender.send(&audience).await?;

    if cli.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "audience": audience.to_string() })
        );
    } else {
        eprintln!("Sent rich push to {}", audience);
    }
    Ok(())
}

async fn list_devices(cli: &Cli) -> Result<(), CliError> {
    let devices = Adb::list_devices(Path::new(ADB)).await?;
    if cli.format == OutputFormat::Json {
        return print_json(&devices);
    }
    if devices.is_empty() {
        eprintln!("No devices attached");
    }
    for device in &devices {
        match &device.model {
            Some(model) => println!("{} -- {} ({})", device.serial, model, device.state),
            None => println!("{} ({})", device.serial, device.state),
        }
    }
    Ok(())
}

async fn dump_window(cli: &Cli, config: &ProbeConfig, full: bool) -> Result<(), CliError> {
    let device = connect(cli, config).await?;
    let tree = device.dump().await?;

    if full {
        return print_json(&tree);
    }
    let mut rows = Vec::new();
    collect_interesting(&tree, 0, &mut rows);
    if cli.format == OutputFormat::Json {
        let concise: Vec<serde_json::Value> =
            rows.iter().map(|(_, node)| node_to_concise_json(node)).collect();
        return print_json(&concise);
    }
    for (depth, node) in &rows {
        println!("{}{}", "  ".repeat(*depth), node.summary());
    }
    eprintln!("{} views", rows.len());
    Ok(())
}

/// A view worth showing: it has a description or text, or it takes clicks.
fn is_interesting(node: &UiNode) -> bool {
    node.content_desc.is_some()
        || node.text.as_deref().is_some_and(|t| !t.is_empty())
        || node.clickable
}

/// Interesting views in pre-order, with their depth among interesting ancestors.
fn collect_interesting<'a>(nodes: &'a [UiNode], depth: usize, out: &mut Vec<(usize, &'a UiNode)>) {
    for node in nodes {
        if is_interesting(node) {
            out.push((depth, node));
            collect_interesting(&node.children, depth + 1, out);
        } else {
            collect_interesting(&node.children, depth, out);
        }
    }
}

/// Serialize a node concisely: no empty fields, no children.
fn node_to_concise_json(node: &UiNode) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    if let Some(ref class) = node.class_name {
        map.insert("class".into(), serde_json::Value::String(class.clone()));
    }
    if let Some(ref desc) = node.content_desc {
        map.insert("desc".into(), serde_json::Value::String(desc.clone()));
    }
    if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
        map.insert("text".into(), serde_json::Value::String(text.to_string()));
    }
    if node.checkable {
        map.insert("checked".into(), serde_json::Value::Bool(node.checked));
    }
    if !node.enabled {
        map.insert("enabled".into(), serde_json::Value::Bool(false));
    }
    if let Some(bounds) = node.bounds {
        let (x, y) = bounds.center();
        map.insert("center".into(), serde_json::json!([x, y]));
    }
    serde_json::Value::Object(map)
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn show_config(cli: &Cli, config: &ProbeConfig) -> Result<(), CliError> {
    let mut shown = config.clone();
    shown.master_secret = shown.master_secret.as_deref().map(mask);

    if cli.format == OutputFormat::Json {
        return print_json(&shown);
    }
    println!("config file:    {}", ProbeConfig::default_path().display());
    println!("api base url:   {}", shown.api_base_url);
    println!("app key:        {}", shown.app_key.as_deref().unwrap_or("(not set)"));
    println!("master secret:  {}", shown.master_secret.as_deref().unwrap_or("(not set)"));
    println!("device serial:  {}", shown.device_serial.as_deref().unwrap_or("(adb default)"));
    println!("app package:    {}", shown.app_package);
    println!("app label:      {}", shown.app_label);
    println!("notification wait: {}ms", shown.timings.notification_wait_ms);
    Ok(())
}

fn set_credentials(app_key: &str, master_secret: &str) -> Result<(), CliError> {
    let mut config = ProbeConfig::load();
    config.app_key = Some(app_key.to_string());
    config.master_secret = Some(master_secret.to_string());
    config
        .save()
        .map_err(|e| CliError::Config(format!("Failed to save config: {}", e)))?;
    eprintln!("Saved credentials to {}", ProbeConfig::default_path().display());
    Ok(())
}
