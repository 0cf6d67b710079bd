pub mod scripted;
pub mod stub;
pub mod tesseract;

pub use scripted::ScriptedRecognizer;
pub use stub::StubRecognizer;
pub use tesseract::{TesseractConfig, TesseractRecognizer, DEFAULT_WHITELIST};
