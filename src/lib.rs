//! Deposit container scanner.
//!
//! Turns a noisy stream of camera frames and OCR readings into a deduplicated
//! record of deposit containers and their refund value.
//!
//! # Pipeline
//!
//! ```text
//! frame -> detector -> box -> region::expand -> crop -> recognizer -> text
//!       -> normalize -> token -> ConsensusBuffer -> winner
//!       -> CategoryTable::resolve -> SessionLedger::commit
//! ```
//!
//! Detection and text recognition are external collaborators behind the
//! `DetectorBackend` and `TextRecognizer` traits. The interesting part is the
//! temporal consensus: a token is only committed once enough frames agree on
//! it, and the ledger accumulates committed items for the whole session.
//!
//! # Module Structure
//!
//! - `frame`: RGB frames and cropped image regions
//! - `ingest`: capture devices (synthetic, V4L2, image directories, scripted)
//! - `detect`: detector backends and the backend registry
//! - `recognize`: text recognizers and OCR preprocessing
//! - `region`, `normalize`, `category`, `consensus`, `ledger`: the scan core
//! - `controller`, `session`: the state machine and the session it writes to
//! - `receipt`: ledger snapshots for presentation
//! - `config`: file + environment configuration

pub mod category;
pub mod config;
pub mod consensus;
pub mod controller;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod ledger;
pub mod normalize;
pub mod receipt;
pub mod recognize;
pub mod region;
pub mod session;

pub use category::{Category, CategoryTable, Classification, UNKNOWN_CATEGORY};
pub use config::ScannerConfig;
pub use consensus::{
    Consensus, ConsensusBuffer, ConsensusSettings, Observation, Resolution,
};
pub use controller::{
    Commit, ScanController, ScanError, ScanEvent, ScanSettings, ScanState, SkipReason,
    StepOutcome, StopHandle, StopReason,
};
pub use detect::{
    BackendRegistry, Detection, DetectionPriority, DetectionResult, DetectorBackend,
    ScriptedBackend, StubBackend,
};
pub use frame::{Frame, ImageRegion};
pub use ingest::{open_source, CaptureConfig, CaptureDevice, ScriptedSource, SyntheticSource};
pub use ledger::{CategoryTotal, LedgerEntry, SessionLedger};
pub use normalize::{normalize, Token};
pub use receipt::{format_euros, Receipt, ReceiptLine};
pub use recognize::{ScriptedRecognizer, StubRecognizer, TesseractRecognizer, TextRecognizer};
pub use region::{expand, BoundingBox, Region};
pub use session::ScanSession;

use anyhow::{anyhow, Result};

/// Build the detector backend named in `config`, via the registry.
pub fn build_detector(config: &ScannerConfig) -> Result<Box<dyn DetectorBackend>> {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    #[cfg(feature = "backend-tract")]
    {
        if let Some(model_path) = &config.detection.model_path {
            registry.register(detect::TractBackend::new(
                model_path,
                config.capture.width,
                config.capture.height,
            )?);
        }
    }
    if config.detection.backend == "tract" && !registry.contains("tract") {
        return Err(anyhow!(
            "detector backend tract requires the backend-tract feature and a model_path"
        ));
    }
    registry.take(&config.detection.backend)
}

/// Build the text recognizer named in `config`.
pub fn build_recognizer(config: &ScannerConfig) -> Result<Box<dyn TextRecognizer>> {
    let settings = &config.recognizer;
    match settings.backend.as_str() {
        "tesseract" => Ok(Box::new(TesseractRecognizer::new(
            recognize::TesseractConfig {
                command: settings.tesseract_cmd.clone(),
                whitelist: settings.whitelist.clone(),
                ..recognize::TesseractConfig::default()
            },
        ))),
        "stub" => Ok(Box::new(StubRecognizer::new(&settings.stub_text))),
        other => Err(anyhow!("unknown recognizer backend {:?}", other)),
    }
}

/// Wire a controller from configuration.
pub fn build_controller(config: &ScannerConfig) -> Result<ScanController> {
    ScanController::new(
        build_detector(config)?,
        build_recognizer(config)?,
        config.categories.clone(),
        config.consensus,
        config.scan_settings(),
    )
}
