//! Text recognition: read the printed code from a cropped item region.

mod backend;
mod backends;
pub mod preprocess;

pub use backend::TextRecognizer;
pub use backends::{
    ScriptedRecognizer, StubRecognizer, TesseractConfig, TesseractRecognizer, DEFAULT_WHITELIST,
};
