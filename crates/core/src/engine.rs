use std::sync::Arc;

use anyhow::{Context, Result};

use crate::error::{EngineError, EngineResult, PlatformError};
use crate::gesture::{Anchor, GestureExecutor};
use crate::locator::WindowLocator;
use crate::logger;
use crate::palette::ColorPaletteMapper;
use crate::platform::Platform;
use crate::resolver::{RegionResolver, Tool};
use crate::session::SessionContext;
use crate::settings::Settings;
use crate::sleep::Clock;
use crate::types::*;

/// Runs action plans and individual gesture calls against a session.
pub struct ActionEngine {
    platform: Box<dyn Platform>,
    locator: WindowLocator,
    resolver: RegionResolver,
    palette: ColorPaletteMapper,
    gestures: GestureExecutor,
    settings: Settings,
    clock: Arc<dyn Clock>,
}

impl ActionEngine {
    pub fn new(platform: Box<dyn Platform>, settings: Settings, clock: Arc<dyn Clock>) -> Result<Self> {
        let locator = WindowLocator::new(&settings.app).context("invalid app.title_pattern")?;
        let resolver = RegionResolver::new(&settings).context("invalid control name pattern")?;
        let palette = ColorPaletteMapper::new(&settings.palette);
        let gestures = GestureExecutor::new(platform.input(), clock.clone(), &settings);
        Ok(Self { platform, locator, resolver, palette, gestures, settings, clock })
    }

    /// Execute `plan` step by step. Terminal errors abort the remaining
    /// steps; other failures are recorded and the plan continues.
    pub fn execute(&mut self, session: &mut SessionContext, plan: &[ActionStep]) -> ActionResult {
        session.begin_invocation();
        logger::info_p("engine", &format!("executing plan of {} step(s)", plan.len()));

        let mut executed = 0usize;
        let mut errors: Vec<String> = Vec::new();
        let mut first_failure: Option<(&'static str, &'static str, String)> = None;
        let mut aborted = false;

        for step in plan {
            match self.run_step(session, step) {
                Ok(status) => {
                    executed += 1;
                    logger::debug_p("engine", &status);
                }
                Err(e) => {
                    let message = format!("{} failed: {}", step.name(), e);
                    logger::error_p("engine", &message);
                    if first_failure.is_none() {
                        first_failure = Some((step.name(), e.kind(), message.clone()));
                    }
                    errors.push(message);
                    if e.is_terminal() {
                        aborted = true;
                        break;
                    }
                }
            }
        }

        let result = match first_failure {
            None => ActionResult::ok(format!("{} actions executed.", executed)),
            Some((step, kind, message)) => ActionResult::failed(message)
                .with_detail("failed_step", step)
                .with_detail("error_kind", kind)
                .with_detail("errors", errors)
                .with_detail("aborted", aborted),
        };
        let result = result
            .with_detail("executed", executed)
            .with_detail("steps", plan.len());
        logger::info_p("engine", &format!("Done: {} - {}", result.success, result.message));
        result
    }

    fn run_step(&mut self, session: &mut SessionContext, step: &ActionStep) -> EngineResult<String> {
        match step {
            ActionStep::OpenApplication => self.open_application(session),
            ActionStep::SelectColor { color } => self.select_color(session, color),
            ActionStep::WriteText { text } => self.write_text(session, text),
            ActionStep::WriteTextAt { text, x, y } => self.write_text_at(session, text, *x, *y),
            ActionStep::DrawRectangle { x1, y1, x2, y2 } => {
                self.draw_rectangle(session, RelativeRect::new(*x1, *y1, *x2, *y2))
            }
            ActionStep::WriteTextInLastRectangle { text } => self.write_text_in_last_rectangle(session, text),
            ActionStep::CloseApplication => self.close_application(session),
        }
    }

    /// Window rectangle of the attached window. A stale handle detaches the
    /// session.
    fn window_rect(session: &mut SessionContext) -> EngineResult<ScreenRect> {
        let rect = session.window()?.rect();
        match rect {
            Ok(rect) => Ok(rect),
            Err(PlatformError::WindowGone) => {
                logger::warn_p("engine", "target window is gone, detaching");
                session.detach();
                Err(EngineError::NotAttached)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Common precondition of every gesture: a live, focused window.
    fn prepare(&mut self, session: &mut SessionContext) -> EngineResult<ScreenRect> {
        let rect = Self::window_rect(session)?;
        self.gestures.ensure_focus(session)?;
        Ok(rect)
    }

    /// Detach on `NotAttached` raised from inside a gesture.
    fn settle<T>(session: &mut SessionContext, result: EngineResult<T>) -> EngineResult<T> {
        if matches!(result, Err(EngineError::NotAttached)) && session.is_attached() {
            logger::warn_p("engine", "window lost during gesture, detaching");
            session.detach();
        }
        result
    }

    pub fn open_application(&mut self, session: &mut SessionContext) -> EngineResult<String> {
        logger::info_p("engine", "Action: open_application");
        session.reset();

        let exe = self.settings.app.exe.clone();
        self.platform
            .launch(&exe)
            .map_err(|e| EngineError::Launch(format!("{} ({})", exe, e)))?;
        self.clock.sleep_ms(self.settings.app.launch_settle_ms);

        let mut window = self.locator.locate(self.platform.as_ref(), self.clock.as_ref())?;
        if let Err(e) = window.maximize() {
            logger::warn_p("engine", &format!("maximize failed ({})", e));
        }
        if let Err(e) = window.foreground() {
            logger::warn_p("engine", &format!("foreground failed ({})", e));
        }
        self.clock.sleep_ms(self.settings.timing.focus_settle_ms);
        session.attach(window);
        Ok("Paint opened successfully and maximized".into())
    }

    pub fn select_color(&mut self, session: &mut SessionContext, color: &str) -> EngineResult<String> {
        logger::info_p("engine", &format!("Action: select_color -> {}", color));
        let rect = self.prepare(session)?;
        let (target, matched) = self.palette.resolve(&rect, color);
        let mut points = vec![target];
        if matched {
            points.push(self.palette.fallback());
        }
        let hit = self.gestures.click_with_fallback(&points);
        let hit = Self::settle(session, hit)?;
        Ok(format!("Color '{}' selected at {}", color, hit))
    }

    pub fn write_text(&mut self, session: &mut SessionContext, text: &str) -> EngineResult<String> {
        logger::info_p("engine", &format!("Action: write_text (len={})", text.chars().count()));
        self.place_text(session, text, Anchor::Inset)?;
        Ok(format!("Text:'{}' added successfully", text))
    }

    /// Text at a canvas-relative point.
    pub fn write_text_at(&mut self, session: &mut SessionContext, text: &str, x: i32, y: i32) -> EngineResult<String> {
        logger::info_p("engine", &format!("Action: write_text_at ({},{}) (len={})", x, y, text.chars().count()));
        self.place_text(session, text, Anchor::At(Point::new(x, y)))?;
        Ok(format!("Text:'{}' added at ({},{})", text, x, y))
    }

    pub fn write_text_in_last_rectangle(&mut self, session: &mut SessionContext, text: &str) -> EngineResult<String> {
        logger::info_p("engine", &format!("Action: write_text_in_last_rectangle (len={})", text.chars().count()));
        session.window()?;
        let rect = session.last_rectangle().ok_or(EngineError::NoLastRectangle)?;
        self.place_text(session, text, Anchor::Inside(rect))?;
        Ok(format!("Text inserted inside rectangle ({},{})-({},{})", rect.x1, rect.y1, rect.x2, rect.y2))
    }

    fn place_text(&mut self, session: &mut SessionContext, text: &str, anchor: Anchor) -> EngineResult<()> {
        self.prepare(session)?;
        let result = {
            let win = session.window()?;
            let canvas = self.resolver.resolve_canvas(win)?;
            self.gestures.place_and_type_text(win, &self.resolver, &canvas, text, anchor)
        };
        let placed = Self::settle(session, result)?;
        logger::debug_p("engine", &format!("text anchored at {}", placed.anchor));
        Ok(())
    }

    pub fn draw_rectangle(&mut self, session: &mut SessionContext, rect: RelativeRect) -> EngineResult<String> {
        logger::info_p("engine", &format!("Action: draw_rectangle {}", rect));
        self.prepare(session)?;
        let result = {
            let win = session.window()?;
            self.gestures.select_tool(win, &self.resolver, Tool::Rectangle);
            let canvas = self.resolver.resolve_canvas(win)?;
            self.gestures.drag_rectangle(&canvas, rect)
        };
        let drawn = Self::settle(session, result)?;
        session.set_last_rectangle(drawn);
        Ok(format!("Rectangle drawn from ({},{}) to ({},{})", drawn.x1, drawn.y1, drawn.x2, drawn.y2))
    }

    /// Center of the last drawn rectangle as `x,y`.
    pub fn last_rectangle_center(&self, session: &SessionContext) -> EngineResult<String> {
        let c = session.last_rectangle_center()?;
        Ok(format!("{},{}", c.x, c.y))
    }

    pub fn close_application(&mut self, session: &mut SessionContext) -> EngineResult<String> {
        logger::info_p("engine", "Action: close_application");
        let rect = self.prepare(session)?;
        let inset = self.settings.text.close_inset;
        let target = Point::new(rect.right.saturating_sub(inset.x), rect.top.saturating_add(inset.y));
        let clicked = self.gestures.click(target);
        Self::settle(session, clicked)?;
        session.detach();
        Ok("Paint closed".into())
    }
}
