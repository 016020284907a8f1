use thiserror::Error;

/// The GPU API, an adapter, or a device could not be obtained.
///
/// Terminal for the session: callers surface it once and never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct UnsupportedError {
    reason: Option<String>,
}

impl UnsupportedError {
    pub fn new() -> Self {
        Self { reason: None }
    }

    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    fn message(&self) -> String {
        match &self.reason {
            Some(reason) => format!("GPU rendering is not supported here: {reason}"),
            None => "GPU rendering is not supported here".to_string(),
        }
    }
}

impl Default for UnsupportedError {
    fn default() -> Self {
        Self::new()
    }
}

/// Exceptional engine failures. Shader compile failures are not errors; they
/// travel as [`crate::CompileDiagnostics`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),
    #[error("engine was torn down before initialisation finished")]
    Detached,
    #[error("engine has already been destroyed")]
    Destroyed,
    #[error("canvas {width}x{height} exceeds the GPU texture limit of {max}")]
    CanvasTooLarge { width: u32, height: u32, max: u32 },
    #[error("frame capture failed: {0}")]
    Capture(String),
}
