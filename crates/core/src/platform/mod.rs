pub mod console;
pub mod stub;

#[cfg(target_os = "windows")]
pub mod win32;

use std::time::Duration;

use regex::Regex;

use crate::error::PlatformResult;
use crate::logger;
use crate::types::*;

/// Primitive OS-level input at absolute screen coordinates.
pub trait InputSynthesizer: Send {
    fn move_to(&mut self, p: Point) -> PlatformResult<()>;
    fn press(&mut self, p: Point) -> PlatformResult<()>;
    fn release(&mut self, p: Point) -> PlatformResult<()>;
    fn click(&mut self, p: Point) -> PlatformResult<()>;
    /// Chord such as `ctrl+v`, `alt+h` or a single key `t`.
    fn key_combo(&mut self, combo: &str) -> PlatformResult<()>;
    fn set_clipboard(&mut self, text: &str) -> PlatformResult<()>;
    fn clipboard(&mut self) -> PlatformResult<String>;
}

/// Handle to the target's top-level window. Goes stale silently when the
/// application exits; the next query reports `PlatformError::WindowGone`.
pub trait WindowHandle: Send {
    fn title(&self) -> &str;
    fn rect(&self) -> PlatformResult<ScreenRect>;
    fn has_focus(&self) -> bool;
    fn focus(&mut self) -> PlatformResult<()>;
    fn maximize(&mut self) -> PlatformResult<()>;
    fn foreground(&mut self) -> PlatformResult<()>;
    /// Structured query for a descendant control whose name matches
    /// `name`, waiting up to `timeout` for it to exist.
    fn find_control(&self, name: &Regex, kind: ControlKind, timeout: Duration)
        -> PlatformResult<ScreenRect>;
}

/// Desktop-level operations (process launch, window enumeration, factories).
pub trait Platform: Send {
    fn launch(&mut self, exe: &str) -> PlatformResult<()>;
    /// Topmost window owned by a process running `exe`.
    fn top_window(&self, exe: &str) -> PlatformResult<Option<WindowInfo>>;
    /// Every top-level window owned by processes running `exe`.
    fn process_windows(&self, exe: &str) -> PlatformResult<Vec<WindowInfo>>;
    /// Windows of any application whose title matches `pattern`.
    fn windows_matching(&self, pattern: &Regex) -> PlatformResult<Vec<WindowInfo>>;
    /// Every visible desktop-level window.
    fn desktop_windows(&self) -> PlatformResult<Vec<WindowInfo>>;
    fn attach(&self, window: &WindowInfo) -> PlatformResult<Box<dyn WindowHandle>>;
    fn input(&self) -> Box<dyn InputSynthesizer>;
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Box<dyn Platform> {
    for prefix in ["locator", "resolver", "palette", "gesture"] {
        logger::register_prefix(prefix, logger::COLOR_GRAY);
    }
    logger::register_prefix("engine", logger::COLOR_BLUE);
    logger::register_prefix("orchestrator", logger::COLOR_GREEN);
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_MAGENTA);
        return Box::new(stub::StubPlatform::new(stub::StubConfig::default()));
    }
    #[cfg(target_os = "windows")]
    {
        logger::register_prefix("win32", logger::COLOR_MAGENTA);
        return Box::new(win32::Win32Platform::new());
    }
    #[cfg(not(target_os = "windows"))]
    {
        logger::warn("no native back-end for this OS, using the simulated desktop");
        logger::register_prefix("stub", logger::COLOR_MAGENTA);
        return Box::new(stub::StubPlatform::new(stub::StubConfig::default()));
    }
}
