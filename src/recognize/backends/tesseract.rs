use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::frame::ImageRegion;
use crate::recognize::backend::TextRecognizer;
use crate::recognize::preprocess;

/// Well-known install locations, checked in order when no command is configured.
const DEFAULT_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
];

pub const DEFAULT_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Clone, Debug)]
pub struct TesseractConfig {
    /// Explicit binary; `None` searches `DEFAULT_PATHS`, then `$PATH`.
    pub command: Option<PathBuf>,
    /// Characters the engine may emit.
    pub whitelist: String,
    /// OCR engine mode (`--oem`).
    pub engine_mode: u8,
    /// Page segmentation mode (`--psm`). 6 = single uniform block of text.
    pub page_segmentation: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            command: None,
            whitelist: DEFAULT_WHITELIST.to_string(),
            engine_mode: 3,
            page_segmentation: 6,
        }
    }
}

/// Runs the `tesseract` CLI once per region.
///
/// The region is binarized and piped in as PGM on stdin; text comes back on
/// stdout. Nothing is written to disk.
pub struct TesseractRecognizer {
    command: PathBuf,
    config: TesseractConfig,
}

impl TesseractRecognizer {
    pub fn new(config: TesseractConfig) -> Self {
        let command = config
            .command
            .clone()
            .unwrap_or_else(|| locate_tesseract(DEFAULT_PATHS));
        Self { command, config }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "--oem".to_string(),
            self.config.engine_mode.to_string(),
            "--psm".to_string(),
            self.config.page_segmentation.to_string(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={}", self.config.whitelist),
        ]
    }
}

/// First existing candidate, or bare `tesseract` for a `$PATH` lookup.
pub(crate) fn locate_tesseract(candidates: &[&str]) -> PathBuf {
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from("tesseract"))
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&mut self, region: &ImageRegion) -> Result<String> {
        if region.is_empty() {
            return Ok(String::new());
        }
        let pgm = preprocess::binarize(region).to_pgm();

        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {}", self.command.display()))?;

        // The child must be reaped on every path, including a failed write.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&pgm).context("write image to tesseract"),
            None => Err(anyhow!("tesseract stdin unavailable")),
        };
        if let Err(err) = written {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        let output = child.wait_with_output().context("wait for tesseract")?;
        if !output.status.success() {
            return Err(anyhow!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::region::Region;

    #[test]
    fn falls_back_to_path_lookup() {
        let path = locate_tesseract(&["/definitely/not/here/tesseract"]);
        assert_eq!(path, PathBuf::from("tesseract"));
    }

    #[test]
    fn prefers_existing_candidate() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let existing = file.path().to_str().unwrap().to_string();
        let path = locate_tesseract(&["/definitely/not/here", &existing]);
        assert_eq!(path, file.path());
    }

    #[test]
    fn passes_whitelist_and_modes() {
        let recognizer = TesseractRecognizer::new(TesseractConfig {
            command: Some(PathBuf::from("/opt/tess")),
            ..TesseractConfig::default()
        });
        let args = recognizer.args();
        assert_eq!(recognizer.command(), Path::new("/opt/tess"));
        assert_eq!(&args[..2], &["stdin", "stdout"]);
        assert!(args.contains(&"--psm".to_string()));
        assert!(args
            .last()
            .unwrap()
            .ends_with("ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"));
    }

    #[test]
    fn missing_binary_is_a_recognition_failure() {
        let region = Frame::filled(4, 4, [255, 255, 255], 1)
            .unwrap()
            .crop(&Region {
                x1: 0,
                y1: 0,
                x2: 4,
                y2: 4,
            })
            .unwrap();
        let mut recognizer = TesseractRecognizer::new(TesseractConfig {
            command: Some(PathBuf::from("/definitely/not/here/tesseract")),
            ..TesseractConfig::default()
        });
        assert!(recognizer.recognize(&region).is_err());
    }

    #[cfg(target_os = "linux")]
    fn zombie_children() -> usize {
        let me = std::process::id().to_string();
        std::fs::read_dir("/proc")
            .unwrap()
            .filter_map(|entry| std::fs::read_to_string(entry.ok()?.path().join("stat")).ok())
            .filter(|stat| {
                let fields: Vec<&str> = stat
                    .rsplit_once(')')
                    .map(|(_, rest)| rest.split_whitespace().collect())
                    .unwrap_or_default();
                fields.first() == Some(&"Z") && fields.get(1) == Some(&me.as_str())
            })
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn engine_that_ignores_stdin_is_reaped() {
        // Larger than a pipe buffer, so the write cannot finish before the child exits.
        let region = Frame::filled(400, 400, [0, 0, 0], 1)
            .unwrap()
            .crop(&Region {
                x1: 0,
                y1: 0,
                x2: 400,
                y2: 400,
            })
            .unwrap();
        let mut recognizer = TesseractRecognizer::new(TesseractConfig {
            command: Some(PathBuf::from("true")),
            ..TesseractConfig::default()
        });
        for _ in 0..3 {
            let err = recognizer.recognize(&region).unwrap_err();
            assert!(format!("{:#}", err).contains("write image to tesseract"));
        }
        assert_eq!(zombie_children(), 0);
    }
}
