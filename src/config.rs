use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::category::{Category, CategoryTable};
use crate::consensus::{ConsensusSettings, DEFAULT_MIN_CONFIDENCE_RATIO, DEFAULT_REQUIRED_READINGS};
use crate::controller::ScanSettings;
use crate::detect::DetectionPriority;
use crate::ingest::CaptureConfig;
use crate::recognize::DEFAULT_WHITELIST;

const DEFAULT_DEVICE: &str = "stub://camera";
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_DETECTOR: &str = "stub";
const DEFAULT_DETECTION_THRESHOLD: f32 = 0.5;
const DEFAULT_PADDING: u32 = 20;
const DEFAULT_INTERVAL_MS: u64 = 500;
const DEFAULT_IDLE_SLEEP_MS: u64 = 30;
const DEFAULT_RECOGNIZER: &str = "tesseract";
const DEFAULT_STUB_TEXT: &str = "ABCD1234";

#[derive(Debug, Deserialize, Default)]
struct ScannerConfigFile {
    capture: Option<CaptureConfigFile>,
    consensus: Option<ConsensusConfigFile>,
    detection: Option<DetectionConfigFile>,
    region: Option<RegionConfigFile>,
    #[serde(rename = "loop")]
    timing: Option<LoopConfigFile>,
    recognizer: Option<RecognizerConfigFile>,
    categories: Option<Vec<Category>>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ConsensusConfigFile {
    required_readings: Option<usize>,
    min_confidence_ratio: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    backend: Option<String>,
    confidence_threshold: Option<f32>,
    priority: Option<DetectionPriority>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RegionConfigFile {
    padding: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LoopConfigFile {
    min_interval_ms: Option<u64>,
    idle_sleep_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RecognizerConfigFile {
    backend: Option<String>,
    tesseract_cmd: Option<PathBuf>,
    whitelist: Option<String>,
    stub_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub capture: CaptureConfig,
    pub consensus: ConsensusSettings,
    pub detection: DetectionSettings,
    pub padding: u32,
    pub min_interval: Duration,
    pub idle_sleep: Duration,
    pub recognizer: RecognizerSettings,
    pub categories: CategoryTable,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Registry name of the detector backend (`stub`, `tract`).
    pub backend: String,
    pub confidence_threshold: f32,
    pub priority: DetectionPriority,
    /// ONNX model for the `tract` backend.
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    /// `tesseract` or `stub`.
    pub backend: String,
    pub tesseract_cmd: Option<PathBuf>,
    pub whitelist: String,
    /// Text the `stub` recognizer returns for every region.
    pub stub_text: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::build(ScannerConfigFile::default(), CategoryTable::default())
    }
}

impl ScannerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCANNER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(mut file: ScannerConfigFile) -> Result<Self> {
        let categories = match file.categories.take() {
            Some(categories) => CategoryTable::new(categories)?,
            None => CategoryTable::default(),
        };
        Ok(Self::build(file, categories))
    }

    fn build(file: ScannerConfigFile, categories: CategoryTable) -> Self {
        let capture = file.capture.unwrap_or_default();
        let capture = CaptureConfig {
            device: capture.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            width: capture.width.unwrap_or(DEFAULT_WIDTH),
            height: capture.height.unwrap_or(DEFAULT_HEIGHT),
            target_fps: capture.target_fps.unwrap_or(DEFAULT_FPS),
        };

        let consensus = file.consensus.unwrap_or_default();
        let consensus = ConsensusSettings {
            required_readings: consensus
                .required_readings
                .unwrap_or(DEFAULT_REQUIRED_READINGS),
            min_confidence_ratio: consensus
                .min_confidence_ratio
                .unwrap_or(DEFAULT_MIN_CONFIDENCE_RATIO),
        };

        let detection = file.detection.unwrap_or_default();
        let detection = DetectionSettings {
            backend: detection
                .backend
                .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
            confidence_threshold: detection
                .confidence_threshold
                .unwrap_or(DEFAULT_DETECTION_THRESHOLD),
            priority: detection.priority.unwrap_or_default(),
            model_path: detection.model_path,
        };

        let timing = file.timing.unwrap_or_default();
        let recognizer = file.recognizer.unwrap_or_default();
        let recognizer = RecognizerSettings {
            backend: recognizer
                .backend
                .unwrap_or_else(|| DEFAULT_RECOGNIZER.to_string()),
            tesseract_cmd: recognizer.tesseract_cmd,
            whitelist: recognizer
                .whitelist
                .unwrap_or_else(|| DEFAULT_WHITELIST.to_string()),
            stub_text: recognizer
                .stub_text
                .unwrap_or_else(|| DEFAULT_STUB_TEXT.to_string()),
        };

        Self {
            capture,
            consensus,
            detection,
            padding: file
                .region
                .and_then(|region| region.padding)
                .unwrap_or(DEFAULT_PADDING),
            min_interval: Duration::from_millis(
                timing.min_interval_ms.unwrap_or(DEFAULT_INTERVAL_MS),
            ),
            idle_sleep: Duration::from_millis(timing.idle_sleep_ms.unwrap_or(DEFAULT_IDLE_SLEEP_MS)),
            recognizer,
            categories,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(device) = non_empty_env("SCANNER_DEVICE") {
            self.capture.device = device;
        }
        if let Some(readings) = non_empty_env("SCANNER_REQUIRED_READINGS") {
            self.consensus.required_readings = readings
                .parse()
                .map_err(|_| anyhow!("SCANNER_REQUIRED_READINGS must be a positive integer"))?;
        }
        if let Some(ratio) = non_empty_env("SCANNER_MIN_CONFIDENCE") {
            self.consensus.min_confidence_ratio = ratio
                .parse()
                .map_err(|_| anyhow!("SCANNER_MIN_CONFIDENCE must be a number in (0, 1]"))?;
        }
        if let Some(padding) = non_empty_env("SCANNER_PADDING") {
            self.padding = padding
                .parse()
                .map_err(|_| anyhow!("SCANNER_PADDING must be a non-negative integer"))?;
        }
        if let Some(interval) = non_empty_env("SCANNER_INTERVAL_MS") {
            let millis: u64 = interval
                .parse()
                .map_err(|_| anyhow!("SCANNER_INTERVAL_MS must be an integer number of milliseconds"))?;
            self.min_interval = Duration::from_millis(millis);
        }
        if let Some(detector) = non_empty_env("SCANNER_DETECTOR") {
            self.detection.backend = detector;
        }
        if let Some(cmd) = non_empty_env("SCANNER_TESSERACT_CMD") {
            self.recognizer.tesseract_cmd = Some(PathBuf::from(cmd));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.device.trim().is_empty() {
            return Err(anyhow!("capture device must not be empty"));
        }
        self.consensus.validate()?;
        let threshold = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "detection confidence_threshold must be in [0, 1], got {}",
                threshold
            ));
        }
        if self.detection.backend == "tract" && self.detection.model_path.is_none() {
            return Err(anyhow!("detection backend tract requires model_path"));
        }
        if self.recognizer.whitelist.is_empty() {
            return Err(anyhow!("recognizer whitelist must not be empty"));
        }
        Ok(())
    }

    /// Loop parameters handed to the scan controller.
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            padding: self.padding,
            detection_threshold: self.detection.confidence_threshold,
            priority: self.detection.priority,
            min_interval: self.min_interval,
            idle_sleep: self.idle_sleep,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_config_file(path: &Path) -> Result<ScannerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
