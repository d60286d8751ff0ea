use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use regex::Regex;

use crate::error::{PlatformError, PlatformResult};
use crate::logger;
use crate::types::*;
use super::{InputSynthesizer, Platform, WindowHandle};

const STUB_WINDOW_ID: WindowId = 30001;

/// One observable interaction with the simulated desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Launch(String),
    FocusCheck,
    Focus,
    Maximize,
    Foreground,
    Query(String),
    Move(Point),
    Press(Point),
    Release(Point),
    Click(Point),
    Keys(String),
    SetClipboard(String),
    GetClipboard,
}

/// Earliest enumeration path that can see the target window. Later paths
/// see it too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Exposure {
    TopWindow,
    ProcessWindows,
    TitleSearch,
    Desktop,
}

#[derive(Debug, Clone)]
pub struct StubConfig {
    pub exe: String,
    pub title: String,
    pub window: ScreenRect,
    /// Locate polls that miss before the window appears. `None`: never.
    pub appear_after: Option<u32>,
    pub exposure: Exposure,
    /// Structured controls the accessibility query can find.
    pub controls: Vec<(String, ControlKind, ScreenRect)>,
    /// Clicks at these points fail as if the OS rejected them.
    pub failing_clicks: Vec<Point>,
    pub launch_fails: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            exe: "mspaint.exe".into(),
            title: "Untitled - Paint".into(),
            window: ScreenRect::new(0, 0, 1920, 1040),
            appear_after: Some(0),
            exposure: Exposure::TopWindow,
            controls: Vec::new(),
            failing_clicks: Vec::new(),
            launch_fails: false,
        }
    }
}

#[derive(Debug, Default)]
struct StubState {
    journal: Vec<Call>,
    polls: u32,
    alive: bool,
    focused: bool,
    clipboard: String,
}

/// Simulated desktop hosting one drawing window. Clones share state, so a
/// test can keep a clone to inspect the journal after handing the platform
/// to the engine.
#[derive(Clone)]
pub struct StubPlatform {
    config: Arc<StubConfig>,
    state: Arc<Mutex<StubState>>,
}

impl StubPlatform {
    pub fn new(config: StubConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(StubState {
                alive: true,
                ..StubState::default()
            })),
        }
    }

    pub fn journal(&self) -> Vec<Call> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    pub fn polls(&self) -> u32 {
        self.lock().polls
    }

    pub fn clipboard_text(&self) -> String {
        self.lock().clipboard.clone()
    }

    /// Pre-load the clipboard as if the user had copied something.
    pub fn seed_clipboard(&self, text: &str) {
        self.lock().clipboard = text.to_string();
    }

    /// Simulate the application exiting behind our back.
    pub fn kill_window(&self) {
        let mut s = self.lock();
        s.alive = false;
        s.focused = false;
    }

    /// Simulate the user switching to another window.
    pub fn steal_focus(&self) {
        self.lock().focused = false;
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) {
        self.lock().journal.push(call);
    }

    fn target_info(&self) -> WindowInfo {
        WindowInfo {
            id: STUB_WINDOW_ID,
            title: self.config.title.clone(),
            pid: 4242,
            exe: self.config.exe.clone(),
        }
    }

    fn visible_via(&self, path: Exposure) -> bool {
        let s = self.lock();
        let appeared = self.config.appear_after.map_or(false, |n| s.polls > n);
        s.alive && appeared && path >= self.config.exposure
    }

    fn others() -> Vec<WindowInfo> {
        vec![
            WindowInfo { id: 10001, title: "Windows PowerShell".into(), pid: 100, exe: "pwsh.exe".into() },
            WindowInfo { id: 10002, title: "Inbox - Mail".into(), pid: 200, exe: "mail.exe".into() },
        ]
    }
}

impl Platform for StubPlatform {
    fn launch(&mut self, exe: &str) -> PlatformResult<()> {
        logger::info_p("stub", &format!("launch(\"{}\")", exe));
        self.record(Call::Launch(exe.to_string()));
        if self.config.launch_fails {
            return Err(PlatformError::NotFound(exe.to_string()));
        }
        Ok(())
    }

    fn top_window(&self, exe: &str) -> PlatformResult<Option<WindowInfo>> {
        self.lock().polls += 1;
        if !exe.eq_ignore_ascii_case(&self.config.exe) {
            return Err(PlatformError::NotFound(exe.to_string()));
        }
        Ok(self.visible_via(Exposure::TopWindow).then(|| self.target_info()))
    }

    fn process_windows(&self, exe: &str) -> PlatformResult<Vec<WindowInfo>> {
        if !exe.eq_ignore_ascii_case(&self.config.exe) {
            return Err(PlatformError::NotFound(exe.to_string()));
        }
        let mut found = Vec::new();
        if self.visible_via(Exposure::ProcessWindows) {
            found.push(self.target_info());
        }
        Ok(found)
    }

    fn windows_matching(&self, pattern: &Regex) -> PlatformResult<Vec<WindowInfo>> {
        let mut all = Self::others();
        if self.visible_via(Exposure::TitleSearch) {
            all.push(self.target_info());
        }
        Ok(all.into_iter().filter(|w| pattern.is_match(&w.title)).collect())
    }

    fn desktop_windows(&self) -> PlatformResult<Vec<WindowInfo>> {
        let mut all = Self::others();
        if self.visible_via(Exposure::Desktop) {
            all.push(self.target_info());
        }
        Ok(all)
    }

    fn attach(&self, window: &WindowInfo) -> PlatformResult<Box<dyn WindowHandle>> {
        logger::info_p("stub", &format!("attach(\"{}\", {})", window.title, window.id));
        if window.id != STUB_WINDOW_ID || !self.lock().alive {
            return Err(PlatformError::WindowGone);
        }
        Ok(Box::new(StubWindow { desktop: self.clone(), title: window.title.clone() }))
    }

    fn input(&self) -> Box<dyn InputSynthesizer> {
        Box::new(StubInput { desktop: self.clone() })
    }
}

struct StubWindow {
    desktop: StubPlatform,
    title: String,
}

impl StubWindow {
    fn ensure_alive(&self) -> PlatformResult<()> {
        if self.desktop.lock().alive {
            Ok(())
        } else {
            Err(PlatformError::WindowGone)
        }
    }
}

impl WindowHandle for StubWindow {
    fn title(&self) -> &str { &self.title }

    fn rect(&self) -> PlatformResult<ScreenRect> {
        self.ensure_alive()?;
        Ok(self.desktop.config.window)
    }

    fn has_focus(&self) -> bool {
        self.desktop.record(Call::FocusCheck);
        self.desktop.lock().focused
    }

    fn focus(&mut self) -> PlatformResult<()> {
        logger::info_p("stub", &format!("win({}).focus()", STUB_WINDOW_ID));
        self.ensure_alive()?;
        self.desktop.record(Call::Focus);
        self.desktop.lock().focused = true;
        Ok(())
    }

    fn maximize(&mut self) -> PlatformResult<()> {
        logger::info_p("stub", &format!("win({}).maximize()", STUB_WINDOW_ID));
        self.ensure_alive()?;
        self.desktop.record(Call::Maximize);
        Ok(())
    }

    fn foreground(&mut self) -> PlatformResult<()> {
        self.ensure_alive()?;
        self.desktop.record(Call::Foreground);
        self.desktop.lock().focused = true;
        Ok(())
    }

    fn find_control(&self, name: &Regex, kind: ControlKind, _timeout: Duration)
        -> PlatformResult<ScreenRect>
    {
        self.ensure_alive()?;
        self.desktop.record(Call::Query(name.as_str().to_string()));
        self.desktop
            .config
            .controls
            .iter()
            .find(|(n, k, _)| *k == kind && name.is_match(n))
            .map(|(_, _, r)| *r)
            .ok_or_else(|| PlatformError::Timeout(name.as_str().to_string()))
    }
}

struct StubInput {
    desktop: StubPlatform,
}

impl InputSynthesizer for StubInput {
    fn move_to(&mut self, p: Point) -> PlatformResult<()> {
        self.desktop.record(Call::Move(p));
        Ok(())
    }

    fn press(&mut self, p: Point) -> PlatformResult<()> {
        self.desktop.record(Call::Press(p));
        Ok(())
    }

    fn release(&mut self, p: Point) -> PlatformResult<()> {
        self.desktop.record(Call::Release(p));
        Ok(())
    }

    fn click(&mut self, p: Point) -> PlatformResult<()> {
        logger::info_p("stub", &format!("click{}", p));
        if self.desktop.config.failing_clicks.contains(&p) {
            return Err(PlatformError::Os(format!("click rejected at {}", p)));
        }
        self.desktop.record(Call::Click(p));
        Ok(())
    }

    fn key_combo(&mut self, combo: &str) -> PlatformResult<()> {
        logger::info_p("stub", &format!("keys(\"{}\")", combo));
        self.desktop.record(Call::Keys(combo.to_string()));
        Ok(())
    }

    fn set_clipboard(&mut self, text: &str) -> PlatformResult<()> {
        self.desktop.record(Call::SetClipboard(text.to_string()));
        self.desktop.lock().clipboard = text.to_string();
        Ok(())
    }

    fn clipboard(&mut self) -> PlatformResult<String> {
        self.desktop.record(Call::GetClipboard);
        Ok(self.desktop.lock().clipboard.clone())
    }
}
