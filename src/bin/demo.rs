//! demo - end-to-end synthetic scan with scripted collaborators.
//!
//! Replays a short frame sequence through the real controller: a few items
//! with noisy readings, an empty frame after each item, and a stop/start in
//! the middle. The ledger carries over between the two runs.
//! No camera, model or OCR engine is needed.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use deposit_scanner::{
    BoundingBox, CategoryTable, ConsensusSettings, ScanController, ScanEvent, ScanSession,
    ScanSettings, ScriptedBackend, ScriptedRecognizer, ScriptedSource,
};

#[path = "../ui.rs"]
mod ui;

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;

/// OCR readings per item, one per frame. Each item is followed by one empty frame.
const ITEMS: &[&[&str]] = &[
    &["ABCD 1234", "ABCD1234"],
    &["PET-0042-77", "PETO042-77", "PET004277"],
    &["can 99887766", "CAN99887766", "CAN99887766"],
];

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Pause between frames, in milliseconds.
    #[arg(long, default_value_t = 100)]
    frame_delay_ms: u64,
    /// Optional path for the JSON receipt.
    #[arg(long)]
    receipt_json: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !std::io::stdout().is_terminal());

    let (first, second) = ITEMS.split_at(2);
    let mut controller = {
        let _stage = ui.stage("Build scripted pipeline");
        let mut detector = ScriptedBackend::new();
        let mut recognizer = ScriptedRecognizer::new();
        for readings in ITEMS {
            for reading in *readings {
                detector = detector.then_box(item_box());
                recognizer = recognizer.then_text(reading);
            }
            detector = detector.then_nothing();
        }
        ScanController::new(
            Box::new(detector),
            Box::new(recognizer),
            CategoryTable::default(),
            ConsensusSettings::default(),
            ScanSettings {
                min_interval: Duration::ZERO,
                idle_sleep: Duration::from_millis(args.frame_delay_ms),
                ..ScanSettings::default()
            },
        )?
    };
    let mut session = ScanSession::new();

    for (run, items) in [first, second].into_iter().enumerate() {
        let frames: usize = items.iter().map(|readings| readings.len() + 1).sum();
        let source = ScriptedSource::new(&format!("demo-run-{}", run + 1)).then_blank_frames(
            frames,
            FRAME_WIDTH,
            FRAME_HEIGHT,
        )?;
        controller.start(Box::new(source))?;

        let status = ui.scan_status(&format!("Run {}", run + 1));
        let reason = controller.run(&mut session, |event| match event {
            ScanEvent::Observed { token, pending } => {
                status.update(&format!("Reading {} ({} pending)", token, pending));
            }
            ScanEvent::Committed(commit) => status.line(&format!(
                "+ {} {} (running total {})",
                commit.entry.token,
                commit.entry.category,
                deposit_scanner::format_euros(commit.running_total)
            )),
            ScanEvent::Stopped(_) => {}
        })?;
        status.finish(&format!("Run {} stopped: {:?}", run + 1, reason));
    }

    let receipt = session.receipt()?;
    println!("{}", receipt.render_text());
    if let Some(path) = &args.receipt_json {
        std::fs::write(path, receipt.to_json()?)
            .with_context(|| format!("write receipt to {}", path.display()))?;
        println!("receipt written to {}", path.display());
    }
    Ok(())
}

fn item_box() -> BoundingBox {
    let (w, h) = (FRAME_WIDTH as f32, FRAME_HEIGHT as f32);
    BoundingBox::new(w * 0.3, h * 0.3, w * 0.7, h * 0.7)
}
