//! scanner - scan deposit containers from a camera and print a receipt.
//!
//! Configuration comes from `$SCANNER_CONFIG` plus `SCANNER_*` environment
//! overrides. The scan runs until Ctrl-C, end of stream, `--max-items`, or a
//! capture failure. The receipt is printed in every case.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use deposit_scanner::{
    build_controller, format_euros, open_source, ScanEvent, ScanSession, ScannerConfig,
    StopReason,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(name = "scanner", about = "Scan deposit containers and print a receipt")]
struct Args {
    /// Camera index (maps to /dev/videoN); overrides the configured device.
    #[arg(long, value_name = "N", conflicts_with = "device")]
    camera: Option<u32>,

    /// Capture device string (stub://name, /dev/videoN, dir:///path).
    #[arg(long, value_name = "DEVICE")]
    device: Option<String>,

    /// Stop after this many committed items.
    #[arg(long, value_name = "N")]
    max_items: Option<usize>,

    /// Also write the receipt as JSON to this path.
    #[arg(long, value_name = "PATH")]
    receipt_json: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut cfg = {
        let _stage = ui.stage("Load configuration");
        ScannerConfig::load()?
    };
    if let Some(index) = args.camera {
        cfg.capture.device = index.to_string();
    }
    if let Some(device) = args.device {
        cfg.capture.device = device;
    }
    if args.max_items == Some(0) {
        return Err(anyhow!("--max-items must be at least 1"));
    }

    let mut controller = {
        let _stage = ui.stage("Build detector and recognizer");
        build_controller(&cfg)?
    };
    let device = open_source(&cfg.capture)?;
    let mut session = ScanSession::new();

    let stop = controller.stop_handle();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.request_stop()).context("install Ctrl-C handler")?;
    }

    controller.start(device)?;
    log::info!(
        "scanner running on {} (session {}); press Ctrl-C to stop",
        cfg.capture.device,
        session.id()
    );

    let status = ui.scan_status("Scanning…");
    let mut committed = 0usize;
    let outcome = controller.run(&mut session, |event| match event {
        ScanEvent::Observed { token, pending } => {
            status.update(&format!("Reading {} ({} pending)", token, pending));
        }
        ScanEvent::Committed(commit) => {
            committed += 1;
            status.line(&format!(
                "+ {} {} {} (total {})",
                commit.entry.token,
                commit.entry.category,
                format_euros(commit.entry.value),
                format_euros(commit.running_total)
            ));
            status.update("Scanning…");
            if args.max_items.is_some_and(|max| committed >= max) {
                stop.request_stop();
            }
        }
        ScanEvent::Stopped(reason) => {
            log::info!("scan stopped: {:?}", reason);
        }
    });
    match &outcome {
        Ok(StopReason::EndOfStream) => status.finish("Stream ended"),
        Ok(_) => status.finish("Stopped"),
        Err(err) => status.finish(&format!("Stopped: {}", err)),
    }

    let receipt = session.receipt()?;
    println!("{}", receipt.render_text());
    if let Some(path) = &args.receipt_json {
        std::fs::write(path, receipt.to_json()?)
            .with_context(|| format!("write receipt to {}", path.display()))?;
        log::info!("receipt written to {}", path.display());
    }

    outcome?;
    Ok(())
}
