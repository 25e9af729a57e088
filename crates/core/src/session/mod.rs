pub mod capture_session;

pub use capture_session::{CaptureSession, Phase, SourceKind};
