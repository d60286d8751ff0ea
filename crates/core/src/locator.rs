use std::time::Duration;

use regex::Regex;

use crate::error::{EngineError, EngineResult, PlatformError, PlatformResult};
use crate::logger;
use crate::platform::{Platform, WindowHandle};
use crate::settings::AppSettings;
use crate::sleep::Clock;
use crate::types::WindowInfo;

/// One way of spotting the target window. `Ok(None)` and `Err` both mean
/// "not this time"; the locator moves on to the next strategy.
type Strategy = fn(&WindowLocator, &dyn Platform) -> PlatformResult<Option<WindowInfo>>;

/// Finds the target application's top-level window with bounded retries.
pub struct WindowLocator {
    exe: String,
    title: Regex,
    substring: String,
    timeout: Duration,
    poll: Duration,
    strategies: Vec<(&'static str, Strategy)>,
}

impl WindowLocator {
    pub fn new(app: &AppSettings) -> Result<Self, regex::Error> {
        Ok(Self {
            exe: app.exe.clone(),
            title: Regex::new(&app.title_pattern)?,
            substring: app.title_substring.clone(),
            timeout: Duration::from_millis(app.locate_timeout_ms),
            poll: Duration::from_millis(app.poll_interval_ms.max(1)),
            strategies: vec![
                ("process top window", Self::by_top_window as Strategy),
                ("process windows", Self::by_process_windows as Strategy),
                ("title search", Self::by_title_search as Strategy),
                ("desktop scan", Self::by_desktop_scan as Strategy),
            ],
        })
    }

    fn title_matches(&self, title: &str) -> bool {
        self.title.is_match(title)
    }

    fn by_top_window(&self, platform: &dyn Platform) -> PlatformResult<Option<WindowInfo>> {
        Ok(platform.top_window(&self.exe)?.filter(|w| self.title_matches(&w.title)))
    }

    fn by_process_windows(&self, platform: &dyn Platform) -> PlatformResult<Option<WindowInfo>> {
        Ok(platform
            .process_windows(&self.exe)?
            .into_iter()
            .find(|w| self.title_matches(&w.title)))
    }

    fn by_title_search(&self, platform: &dyn Platform) -> PlatformResult<Option<WindowInfo>> {
        Ok(platform
            .windows_matching(&self.title)?
            .into_iter()
            .find(|w| w.title.contains(&self.substring)))
    }

    fn by_desktop_scan(&self, platform: &dyn Platform) -> PlatformResult<Option<WindowInfo>> {
        Ok(platform
            .desktop_windows()?
            .into_iter()
            .find(|w| !w.title.is_empty() && w.title.contains(&self.substring)))
    }

    /// One pass over every strategy.
    fn sweep(&self, platform: &dyn Platform) -> Option<(&'static str, WindowInfo)> {
        for &(label, strategy) in &self.strategies {
            match strategy(self, platform) {
                Ok(Some(found)) => return Some((label, found)),
                Ok(None) => {}
                Err(e) => logger::debug_p("locator", &format!("{}: {}", label, e)),
            }
        }
        None
    }

    /// Poll until a strategy finds the window and it can be attached, or
    /// the timeout elapses. Never sleeps past the deadline.
    pub fn locate(&self, platform: &dyn Platform, clock: &dyn Clock) -> EngineResult<Box<dyn WindowHandle>> {
        let start = clock.now();
        let deadline = start + self.timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if let Some((label, info)) = self.sweep(platform) {
                match platform.attach(&info) {
                    Ok(handle) => {
                        logger::info_p(
                            "locator",
                            &format!("found \"{}\" via {} after {} attempt(s)", info.title, label, attempts),
                        );
                        return Ok(handle);
                    }
                    Err(PlatformError::WindowGone) => {
                        logger::debug_p("locator", &format!("\"{}\" vanished before attach", info.title));
                    }
                    Err(e) => logger::warn_p("locator", &format!("attach \"{}\": {}", info.title, e)),
                }
            }

            let now = clock.now();
            if now >= deadline {
                break;
            }
            clock.sleep(self.poll.min(deadline - now));
        }
        logger::error_p(
            "locator",
            &format!("no window matching '{}' after {} attempt(s)", self.title.as_str(), attempts),
        );
        Err(EngineError::NotFound {
            pattern: self.title.as_str().to_string(),
            timeout: self.timeout,
        })
    }
}
