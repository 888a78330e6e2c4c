use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use imgbridge_schema::{BufferDescriptor, PlotBuffer};
use imgbridge_transport::Endpoint;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }

    pub fn as_arg(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
            OutputFormat::Pretty => "pretty",
            OutputFormat::Raw => "raw",
        }
    }
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    event: &'static str,
    endpoint: String,
    transport: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct SymbolsOutput<'a> {
    event: &'a str,
    symbols: &'a [String],
    timestamp: String,
}

#[derive(Serialize)]
struct BufferOutput<'a> {
    event: &'a str,
    #[serde(flatten)]
    descriptor: &'a BufferDescriptor,
    type_label: String,
    visualized_width: i32,
    visualized_height: i32,
    size: usize,
    timestamp: String,
}

pub fn print_listening(endpoint: &Endpoint, format: OutputFormat) {
    let transport = match endpoint {
        Endpoint::Tcp(_) => "tcp",
        Endpoint::Unix(_) => "unix",
    };
    match format {
        OutputFormat::Json => print_json(&ListeningOutput {
            event: "listening",
            endpoint: endpoint.to_string(),
            transport,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("listening on {endpoint}");
        }
        OutputFormat::Raw => return,
    }
    flush_stdout();
}

/// Print a symbol list under `event` (`available_symbols`, `observed_symbols`).
///
/// Raw output carries pixel bytes only, so symbol lists are skipped.
pub fn print_symbols(event: &str, symbols: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SymbolsOutput {
            event,
            symbols,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", event]);
            for (index, symbol) in symbols.iter().enumerate() {
                table.add_row(vec![index.to_string(), symbol.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{event}: {}", symbols.join(", "));
        }
        OutputFormat::Raw => return,
    }
    flush_stdout();
}

/// Print buffer metadata under `event` (`plotted` on the host, `buffer` on the window).
///
/// Raw format writes the pixel bytes themselves when they are given.
pub fn print_buffer(
    event: &str,
    descriptor: &BufferDescriptor,
    pixels: &[u8],
    format: OutputFormat,
) {
    let (visualized_width, visualized_height) = descriptor.visualized_dimensions();
    match format {
        OutputFormat::Json => print_json(&BufferOutput {
            event,
            descriptor,
            type_label: descriptor.type_label(),
            visualized_width,
            visualized_height,
            size: pixels.len(),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "TYPE", "SIZE", "LAYOUT", "BYTES"])
                .add_row(vec![
                    descriptor.display_name.clone(),
                    descriptor.type_label(),
                    format!("{visualized_width}x{visualized_height}"),
                    descriptor.pixel_layout.clone(),
                    pixels.len().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{event} name={} type={} size={}x{} stride={} transpose={} bytes={}",
                descriptor.display_name,
                descriptor.type_label(),
                visualized_width,
                visualized_height,
                descriptor.stride,
                descriptor.transpose,
                pixels.len()
            );
        }
        OutputFormat::Raw => {
            print_raw(pixels);
            return;
        }
    }
    flush_stdout();
}

pub fn print_plot_buffer(buffer: &PlotBuffer, format: OutputFormat) {
    print_buffer("buffer", &buffer.descriptor, &buffer.pixels, format);
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
