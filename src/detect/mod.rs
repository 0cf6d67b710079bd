//! Object detection: locate the deposit item in a frame.

mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{ScriptedBackend, StubBackend};
pub use registry::BackendRegistry;
pub use result::{Detection, DetectionPriority, DetectionResult};
