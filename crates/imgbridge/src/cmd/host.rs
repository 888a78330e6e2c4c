use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use imgbridge_peer::{Bridge, HostConfig, PeerError};
use imgbridge_transport::Endpoint;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, Globals, HostArgs};
use crate::exit::{io_error, peer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_buffer, print_listening, print_symbols, OutputFormat};
use crate::patterns;

pub fn run(args: HostArgs, globals: &Globals) -> CliResult<i32> {
    let format = globals.format;
    if let Some(unknown) = args.symbols.iter().find(|s| !patterns::is_known(s)) {
        return Err(CliError::new(
            USAGE,
            format!(
                "unknown symbol {unknown:?}; available patterns: {}",
                patterns::PATTERNS.join(", ")
            ),
        ));
    }
    if args.width <= 0 || args.height <= 0 {
        return Err(CliError::new(USAGE, "--width and --height must be positive"));
    }

    let mut config = if args.development {
        HostConfig::development()
    } else {
        HostConfig::default()
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(timeout) = &args.accept_timeout {
        config.accept_timeout = parse_duration(timeout)?;
    }
    let deadline = args
        .serve_for
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|limit| Instant::now() + limit);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut bridge = Bridge::bind(config).map_err(|err| peer_error("bind failed", err))?;
    print_listening(bridge.endpoint(), format);

    if args.spawn_window {
        let child = spawn_window(bridge.endpoint(), args.window_count, globals)?;
        bridge.attach_process(child);
    }

    let connected = bridge
        .wait_for_window()
        .map_err(|err| peer_error("accept failed", err))?;
    if !connected {
        // Without a window every bridge call below is a no-op.
        warn!(
            timeout = ?bridge.config().accept_timeout,
            "continuing without a window"
        );
    }

    tolerate_disconnect("publish failed", bridge.set_available_symbols(args.symbols.as_slice()))?;
    print_symbols("available_symbols", &args.symbols, format);

    let observed = tolerate_disconnect("fetch failed", bridge.observed_symbols())?;
    print_symbols("observed_symbols", &observed, format);
    for name in &observed {
        serve(&mut bridge, name, &args, format)?;
    }

    while running.load(Ordering::SeqCst) && bridge.is_window_ready() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("serve time elapsed");
            break;
        }

        let mut requested = Vec::new();
        tolerate_disconnect(
            "event loop failed",
            bridge.run_event_loop(|name| requested.push(name.to_string())),
        )?;
        for name in &requested {
            serve(&mut bridge, name, &args, format)?;
        }
    }

    Ok(SUCCESS)
}

fn serve(bridge: &mut Bridge, name: &str, args: &HostArgs, format: OutputFormat) -> CliResult<()> {
    if !args.symbols.iter().any(|s| s == name) {
        warn!(%name, "requested symbol is not available");
        return Ok(());
    }
    let Some((descriptor, pixels)) = patterns::render(name, args.width, args.height) else {
        warn!(%name, "requested symbol is not available");
        return Ok(());
    };

    match bridge.plot_buffer(&descriptor, &pixels) {
        Ok(()) => {
            print_buffer("plotted", &descriptor, &pixels, format);
            Ok(())
        }
        Err(err) => tolerate_disconnect("plot failed", Err(err)),
    }
}

/// A window going away ends the session normally.
fn tolerate_disconnect<T: Default>(context: &str, result: Result<T, PeerError>) -> CliResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_disconnect() => {
            info!(error = %err, "window disconnected");
            Ok(T::default())
        }
        Err(err) => Err(peer_error(context, err)),
    }
}

fn spawn_window(endpoint: &Endpoint, count: Option<usize>, globals: &Globals) -> CliResult<Child> {
    let exe = std::env::current_exe()
        .map_err(|err| io_error("cannot locate imgbridge executable", err))?;

    let mut command = Command::new(exe);
    command
        .arg("--format")
        .arg(globals.format.as_arg())
        .arg("--log-format")
        .arg(globals.log_format.as_arg())
        .arg("--log-level")
        .arg(globals.log_level.as_arg());
    if let Some(path) = &globals.log_file {
        command.arg("--log-file").arg(path);
    }
    command.arg("window").arg("--endpoint").arg(endpoint.to_string());
    if let Some(count) = count {
        command.arg("--count").arg(count.to_string());
    }

    command
        .spawn()
        .map_err(|err| io_error("failed to start window process", err))
}
