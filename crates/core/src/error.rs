use std::time::Duration;

use thiserror::Error;

/// Failures at the OS boundary (window queries and input synthesis).
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("window no longer exists")]
    WindowGone,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
    #[error("os call failed: {0}")]
    Os(String),
    #[error("clipboard: {0}")]
    Clipboard(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Step-level failures of the action engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Paint is not open. Please call open_paint first.")]
    NotAttached,
    #[error("no window matching '{pattern}' appeared within {timeout:?}")]
    NotFound { pattern: String, timeout: Duration },
    #[error("could not launch {0}")]
    Launch(String),
    #[error("could not resolve {0}")]
    Resolution(String),
    #[error("No rectangle found. Draw a rectangle first.")]
    NoLastRectangle,
    #[error("input failed: {0}")]
    Input(#[source] PlatformError),
}

impl EngineError {
    /// Terminal errors abort the rest of a plan.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineError::NotAttached | EngineError::NotFound { .. } | EngineError::Launch(_)
        )
    }

    /// Stable tag used in result details.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotAttached => "not_attached",
            EngineError::NotFound { .. } => "not_found",
            EngineError::Launch(_) => "launch",
            EngineError::Resolution(_) => "resolution",
            EngineError::NoLastRectangle => "precondition_missing",
            EngineError::Input(_) => "input",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<PlatformError> for EngineError {
    /// A vanished window means the session lost its handle.
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::WindowGone => EngineError::NotAttached,
            other => EngineError::Input(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(EngineError::NotAttached.is_terminal());
        assert!(EngineError::Launch("mspaint.exe".into()).is_terminal());
        assert!(!EngineError::NoLastRectangle.is_terminal());
        assert!(!EngineError::Input(PlatformError::WindowGone).is_terminal());
        assert!(!EngineError::Resolution("canvas".into()).is_terminal());
    }

    #[test]
    fn vanished_window_becomes_not_attached() {
        assert!(matches!(EngineError::from(PlatformError::WindowGone), EngineError::NotAttached));
        let e = EngineError::from(PlatformError::Os("denied".into()));
        assert_eq!(e.kind(), "input");
        assert!(e.to_string().contains("denied"));
    }

    #[test]
    fn missing_rectangle_message_mentions_rectangle() {
        assert!(EngineError::NoLastRectangle.to_string().contains("rectangle"));
    }
}
