use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use imgbridge_peer::{Window, WindowConfig, WindowHandler};
use imgbridge_schema::PlotBuffer;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, WindowArgs};
use crate::exit::{peer_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_plot_buffer, print_symbols, OutputFormat};

pub fn run(args: WindowArgs, format: OutputFormat) -> CliResult<i32> {
    let connect_timeout = parse_duration(&args.connect_timeout)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let config = WindowConfig {
        connect_timeout,
        ..WindowConfig::new(args.endpoint.clone())
    };
    let mut window = Window::connect(config).map_err(|err| peer_error("connect failed", err))?;

    let mut printer = Printer {
        format,
        observe: args.observe.clone(),
        available: None,
        received: 0,
    };
    let mut requests_sent = args.request.is_empty();

    while running.load(Ordering::SeqCst) {
        match window.poll(&mut printer) {
            Ok(_) => {}
            Err(err) if err.is_disconnect() => {
                info!("host disconnected");
                return finish(printer.received, args.count);
            }
            Err(err) => return Err(peer_error("poll failed", err)),
        }

        if !requests_sent && printer.available.is_some() {
            for name in &args.request {
                window
                    .request_plot_buffer(name)
                    .map_err(|err| peer_error("request failed", err))?;
            }
            requests_sent = true;
        }

        if args.count.is_some_and(|count| printer.received >= count) {
            return Ok(SUCCESS);
        }
    }

    Ok(SUCCESS)
}

fn finish(received: usize, count: Option<usize>) -> CliResult<i32> {
    match count {
        Some(count) if received < count => Err(CliError::new(
            FAILURE,
            format!("host disconnected after {received} of {count} buffers"),
        )),
        _ => Ok(SUCCESS),
    }
}

/// Prints what arrives and reports observed symbols.
struct Printer {
    format: OutputFormat,
    observe: Option<Vec<String>>,
    available: Option<Vec<String>>,
    received: usize,
}

impl WindowHandler for Printer {
    fn observed_symbols(&mut self) -> Vec<String> {
        match &self.observe {
            Some(names) => names.clone(),
            None => self.available.clone().unwrap_or_default(),
        }
    }

    fn available_symbols(&mut self, names: Vec<String>) {
        print_symbols("available_symbols", &names, self.format);
        self.available = Some(names);
    }

    fn plot_buffer(&mut self, buffer: PlotBuffer) {
        print_plot_buffer(&buffer, self.format);
        self.received += 1;
    }
}
