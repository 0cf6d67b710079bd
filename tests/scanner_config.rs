use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use deposit_scanner::{DetectionPriority, ScannerConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SCANNER_CONFIG",
        "SCANNER_DEVICE",
        "SCANNER_REQUIRED_READINGS",
        "SCANNER_MIN_CONFIDENCE",
        "SCANNER_PADDING",
        "SCANNER_INTERVAL_MS",
        "SCANNER_DETECTOR",
        "SCANNER_TESSERACT_CMD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "capture": {
            "device": "dir:///srv/frames",
            "width": 640,
            "height": 480,
            "target_fps": 15
        },
        "consensus": {
            "required_readings": 3,
            "min_confidence_ratio": 0.75
        },
        "detection": {
            "confidence_threshold": 0.4,
            "priority": "highest_confidence"
        },
        "region": { "padding": 8 },
        "loop": { "min_interval_ms": 250, "idle_sleep_ms": 10 },
        "recognizer": { "backend": "stub", "stub_text": "XYZ98765" }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SCANNER_CONFIG", file.path());
    std::env::set_var("SCANNER_DEVICE", "stub://bench");
    std::env::set_var("SCANNER_PADDING", "12");
    std::env::set_var("SCANNER_TESSERACT_CMD", "/opt/tesseract/bin/tesseract");

    let cfg = ScannerConfig::load().expect("load config");

    assert_eq!(cfg.capture.device, "stub://bench");
    assert_eq!((cfg.capture.width, cfg.capture.height), (640, 480));
    assert_eq!(cfg.capture.target_fps, 15);
    assert_eq!(cfg.consensus.required_readings, 3);
    assert_eq!(cfg.consensus.min_confidence_ratio, 0.75);
    assert_eq!(cfg.detection.confidence_threshold, 0.4);
    assert_eq!(cfg.detection.priority, DetectionPriority::HighestConfidence);
    assert_eq!(cfg.padding, 12);
    assert_eq!(cfg.min_interval, Duration::from_millis(250));
    assert_eq!(cfg.idle_sleep, Duration::from_millis(10));
    assert_eq!(cfg.recognizer.backend, "stub");
    assert_eq!(cfg.recognizer.stub_text, "XYZ98765");
    assert_eq!(
        cfg.recognizer.tesseract_cmd.as_deref(),
        Some(std::path::Path::new("/opt/tesseract/bin/tesseract"))
    );

    clear_env();
}

#[test]
fn loads_toml_config_with_custom_categories() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
[consensus]
required_readings = 4

[detection]
priority = "first"

[[categories]]
name = "PET"
code = 1
value = 25

[[categories]]
name = "CAN"
code = 3
value = 30
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("SCANNER_CONFIG", file.path());

    let cfg = ScannerConfig::load().expect("load config");

    assert_eq!(cfg.consensus.required_readings, 4);
    assert_eq!(cfg.consensus.min_confidence_ratio, 0.6);
    assert_eq!(cfg.detection.priority, DetectionPriority::FirstInList);
    let names: Vec<&str> = cfg
        .categories
        .categories()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["PET", "CAN"]);
    assert!(cfg.categories.by_code(2).is_none());

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ScannerConfig::load().expect("load config");

    assert_eq!(cfg.capture.device, "stub://camera");
    assert_eq!(cfg.consensus.required_readings, 2);
    assert_eq!(cfg.padding, 20);
    assert_eq!(cfg.min_interval, Duration::from_millis(500));
    assert_eq!(cfg.detection.backend, "stub");
    assert_eq!(cfg.recognizer.backend, "tesseract");
    assert_eq!(cfg.categories.categories().len(), 4);

    clear_env();
}

#[test]
fn rejects_invalid_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SCANNER_REQUIRED_READINGS", "0");
    let err = ScannerConfig::load().expect_err("zero readings");
    assert!(err.to_string().contains("required_readings"));

    clear_env();
    std::env::set_var("SCANNER_MIN_CONFIDENCE", "1.5");
    assert!(ScannerConfig::load().is_err());

    clear_env();
    std::env::set_var("SCANNER_INTERVAL_MS", "soon");
    let err = ScannerConfig::load().expect_err("non-numeric interval");
    assert!(err.to_string().contains("SCANNER_INTERVAL_MS"));

    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ not json").expect("write config");
    std::env::set_var("SCANNER_CONFIG", file.path());
    let err = ScannerConfig::load().expect_err("malformed");
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
    std::env::set_var("SCANNER_CONFIG", "/definitely/not/here.json");
    let err = ScannerConfig::load().expect_err("missing");
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}

#[test]
fn rejects_duplicate_category_codes() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "categories": [
        { "name": "PET", "code": 1, "value": 25 },
        { "name": "PET2", "code": 1, "value": 10 }
    ] }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("SCANNER_CONFIG", file.path());
    assert!(ScannerConfig::load().is_err());

    clear_env();
}
