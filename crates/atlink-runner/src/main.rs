//! `atlink`: an interactive terminal for AT-style devices.
//!
//! ```text
//! atlink --address 127.0.0.1:9000
//! atlink --config atlink.yaml --timestamps
//! printf 'ati\nat+csq\n' | atlink --address 127.0.0.1:9000
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use atlink_runner::{
    init_logging, Args, Console, ConsoleInput, Driver, RunnerConfig, RunnerResult, TcpTransport,
};
use atlink_session::SessionStateMachine;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match RunnerConfig::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("atlink: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_filter);
    atlink_metrics::describe_metrics();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(config));
    // The stdin reader may still be blocked on a read.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RunnerConfig) -> RunnerResult<()> {
    let (link_tx, link_rx) = mpsc::channel(1024);
    let (input_tx, input_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    install_ctrlc(shutdown_tx)?;

    let transport = TcpTransport::new(config.address.clone(), link_tx)
        .with_connect_timeout(config.connect_timeout());
    let console = Console::stdout(config.timestamps);
    let mut machine = SessionStateMachine::new(transport, config.session.clone());
    console.attach(&mut machine);

    info!(
        "atlink {} targeting {} (tick {}ms)",
        env!("CARGO_PKG_VERSION"),
        config.address,
        config.tick_ms
    );
    if config.auto_connect {
        machine.connect();
    }

    tokio::spawn(read_stdin(input_tx));

    let driver = Driver::new(
        machine,
        console,
        link_rx,
        input_rx,
        shutdown_rx,
        config.tick(),
    );
    driver.run().await;
    Ok(())
}

/// First Ctrl-C asks the driver to stop; a second one exits immediately.
fn install_ctrlc(shutdown: watch::Sender<bool>) -> RunnerResult<()> {
    let pressed = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if pressed.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        let _ = shutdown.send(true);
    })?;
    Ok(())
}

/// Forward stdin lines to the driver until EOF.
async fn read_stdin(input: mpsc::Sender<ConsoleInput>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if input.send(ConsoleInput::parse(&line)).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                return;
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}
