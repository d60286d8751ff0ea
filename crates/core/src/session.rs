use crate::error::{EngineError, EngineResult};
use crate::platform::WindowHandle;
use crate::types::{Point, RelativeRect};

/// State of one automation session: the attached window and the last
/// rectangle drawn in it. Passed by reference into every engine call.
#[derive(Default)]
pub struct SessionContext {
    window: Option<Box<dyn WindowHandle>>,
    last_rectangle: Option<RelativeRect>,
    focus_verified: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a freshly located window. Starts a new session, so the previous
    /// rectangle is forgotten.
    pub fn attach(&mut self, window: Box<dyn WindowHandle>) {
        self.window = Some(window);
        self.last_rectangle = None;
        self.focus_verified = false;
    }

    /// Drop the window and the rectangle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn detach(&mut self) {
        self.window = None;
        self.focus_verified = false;
    }

    pub fn is_attached(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> EngineResult<&dyn WindowHandle> {
        self.window.as_deref().ok_or(EngineError::NotAttached)
    }

    pub fn window_mut(&mut self) -> EngineResult<&mut (dyn WindowHandle + 'static)> {
        self.window.as_deref_mut().ok_or(EngineError::NotAttached)
    }

    pub fn last_rectangle(&self) -> Option<RelativeRect> {
        self.last_rectangle
    }

    pub fn set_last_rectangle(&mut self, rect: RelativeRect) {
        self.last_rectangle = Some(rect.normalized());
    }

    pub fn last_rectangle_center(&self) -> EngineResult<Point> {
        self.last_rectangle
            .map(|r| r.center())
            .ok_or(EngineError::NoLastRectangle)
    }

    pub(crate) fn focus_verified(&self) -> bool {
        self.focus_verified
    }

    pub(crate) fn mark_focus_verified(&mut self) {
        self.focus_verified = true;
    }

    /// Each engine invocation checks focus again.
    pub(crate) fn begin_invocation(&mut self) {
        self.focus_verified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::stub::{StubConfig, StubPlatform};
    use crate::platform::Platform;

    fn window(stub: &StubPlatform) -> Box<dyn WindowHandle> {
        let info = stub.top_window("mspaint.exe").unwrap().unwrap();
        stub.attach(&info).unwrap()
    }

    #[test]
    fn detached_session_reports_not_attached() {
        let session = SessionContext::new();
        assert!(matches!(session.window(), Err(EngineError::NotAttached)));
        assert!(matches!(session.last_rectangle_center(), Err(EngineError::NoLastRectangle)));
    }

    #[test]
    fn sessions_are_isolated() {
        let stub = StubPlatform::new(StubConfig::default());
        let mut a = SessionContext::new();
        let b = SessionContext::new();
        a.attach(window(&stub));
        a.set_last_rectangle(RelativeRect::new(110, 60, 10, 10));

        assert!(a.is_attached());
        assert_eq!(a.last_rectangle(), Some(RelativeRect::new(10, 10, 110, 60)));
        assert_eq!(a.last_rectangle_center().unwrap(), Point::new(60, 35));
        assert!(!b.is_attached());
        assert_eq!(b.last_rectangle(), None);
    }

    #[test]
    fn reattaching_forgets_previous_rectangle() {
        let stub = StubPlatform::new(StubConfig::default());
        let mut s = SessionContext::new();
        s.attach(window(&stub));
        s.set_last_rectangle(RelativeRect::new(0, 0, 50, 50));
        s.attach(window(&stub));
        assert_eq!(s.last_rectangle(), None);
    }

    #[test]
    fn detach_keeps_rectangle() {
        let stub = StubPlatform::new(StubConfig::default());
        let mut s = SessionContext::new();
        s.attach(window(&stub));
        s.set_last_rectangle(RelativeRect::new(0, 0, 50, 50));
        s.detach();
        assert!(!s.is_attached());
        assert!(s.last_rectangle().is_some());
    }
}
