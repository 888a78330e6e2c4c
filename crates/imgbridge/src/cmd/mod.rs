use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use imgbridge_transport::Endpoint;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::logging::{LogFormat, LogLevel};
use crate::output::OutputFormat;

pub mod host;
pub mod version;
pub mod window;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for a window, publish symbols and serve plot requests.
    Host(HostArgs),
    /// Connect to a host and print the buffers it sends.
    Window(WindowArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Global settings a command may need to pass on to a child process.
#[derive(Debug, Clone)]
pub struct Globals {
    pub format: OutputFormat,
    pub log_format: LogFormat,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

pub fn run(command: Command, globals: &Globals) -> CliResult<i32> {
    match command {
        Command::Host(args) => host::run(args, globals),
        Command::Window(args) => window::run(args, globals.format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Endpoint to listen on (`tcp:HOST:PORT` or a Unix socket path).
    #[arg(long, env = "IMGBRIDGE_ENDPOINT")]
    pub endpoint: Option<Endpoint>,
    /// Wait for the window to connect (e.g. 10s, 500ms).
    #[arg(long, env = "IMGBRIDGE_ACCEPT_TIMEOUT")]
    pub accept_timeout: Option<String>,
    /// Use the development defaults: fixed port 9588 and a 10 minute accept window.
    #[arg(long)]
    pub development: bool,
    /// Symbols to publish (comma-separated pattern names).
    #[arg(long, value_delimiter = ',', default_value = "gradient,checker,ramp")]
    pub symbols: Vec<String>,
    /// Width of served buffers.
    #[arg(long, default_value = "64")]
    pub width: i32,
    /// Height of served buffers.
    #[arg(long, default_value = "48")]
    pub height: i32,
    /// Spawn `imgbridge window` against this host.
    #[arg(long)]
    pub spawn_window: bool,
    /// Exit after N buffers when spawning the window (passed as its --count).
    #[arg(long, requires = "spawn_window")]
    pub window_count: Option<usize>,
    /// Stop serving after this long (e.g. 30s). Default: until the window disconnects.
    #[arg(long)]
    pub serve_for: Option<String>,
}

#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Host endpoint to connect to.
    #[arg(long, env = "IMGBRIDGE_ENDPOINT")]
    pub endpoint: Endpoint,
    /// Keep retrying the connection this long (e.g. 10s).
    #[arg(long, env = "IMGBRIDGE_CONNECT_TIMEOUT", default_value = "10s")]
    pub connect_timeout: String,
    /// Symbols to report as observed (comma-separated). Default: every available symbol.
    #[arg(long, value_delimiter = ',')]
    pub observe: Option<Vec<String>>,
    /// Request these buffers once symbols are published (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub request: Vec<String>,
    /// Exit after receiving N buffers.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
