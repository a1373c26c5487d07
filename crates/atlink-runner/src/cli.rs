//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Interactive terminal for AT-style devices behind a TCP UART bridge.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "atlink", version, about)]
pub struct Args {
    /// YAML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address of the UART bridge, e.g. 127.0.0.1:9000.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Step interval in milliseconds.
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Response timeout in milliseconds.
    #[arg(long, conflicts_with = "no_response_timeout")]
    pub response_timeout_ms: Option<u64>,

    /// Wait for responses forever.
    #[arg(long)]
    pub no_response_timeout: bool,

    /// Send a keepalive `AT` after this many idle milliseconds.
    #[arg(long)]
    pub ping_interval_ms: Option<u64>,

    /// Do not print incoming lines.
    #[arg(long)]
    pub no_echo: bool,

    /// Do not connect at startup; use `:connect`.
    #[arg(long)]
    pub no_auto_connect: bool,

    /// Prefix output lines with a timestamp.
    #[arg(long)]
    pub timestamps: bool,

    /// Log filter, e.g. `debug` or `atlink_session=trace`. `RUST_LOG` wins.
    #[arg(long)]
    pub log: Option<String>,
}
