use std::sync::Arc;

use crate::error::{EngineError, EngineResult, PlatformResult};
use crate::logger;
use crate::platform::{InputSynthesizer, WindowHandle};
use crate::resolver::{RegionResolver, Tool};
use crate::session::SessionContext;
use crate::settings::{Margins, Settings, TextSettings, Timing};
use crate::sleep::Clock;
use crate::types::*;

/// Whether a failing step aborts the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    BestEffort,
}

/// Primitive operation inside a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOp {
    Move(Point),
    Press(Point),
    Release(Point),
    Click(Point),
    Keys(String),
    /// Remember the current clipboard text so it can be put back later.
    StashClipboard,
    SetClipboard(String),
    RestoreClipboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureStep {
    pub op: GestureOp,
    pub requirement: Requirement,
    /// Settle delay after the op, in milliseconds.
    pub settle_ms: u64,
}

/// Ordered list of primitive steps making up one user-visible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    name: &'static str,
    steps: Vec<GestureStep>,
}

impl Gesture {
    pub fn new(name: &'static str) -> Self {
        Self { name, steps: Vec::new() }
    }

    pub fn required(mut self, op: GestureOp, settle_ms: u64) -> Self {
        self.steps.push(GestureStep { op, requirement: Requirement::Required, settle_ms });
        self
    }

    pub fn best_effort(mut self, op: GestureOp, settle_ms: u64) -> Self {
        self.steps.push(GestureStep { op, requirement: Requirement::BestEffort, settle_ms });
        self
    }
}

/// Where free text is placed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Fixed inset from the canvas top-left.
    Inset,
    /// Canvas-relative point.
    At(Point),
    /// Text box inside a canvas-relative rectangle.
    Inside(RelativeRect),
}

/// Where a text insertion ended up, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPlacement {
    pub anchor: Point,
    /// Dragged text box, for `Anchor::Inside`.
    pub text_box: Option<ScreenRect>,
}

/// Composes primitive input into gestures with settle delays and clamping.
pub struct GestureExecutor {
    input: Box<dyn InputSynthesizer>,
    clock: Arc<dyn Clock>,
    timing: Timing,
    margins: Margins,
    text: TextSettings,
    stashed_clipboard: Option<String>,
}

impl GestureExecutor {
    pub fn new(input: Box<dyn InputSynthesizer>, clock: Arc<dyn Clock>, settings: &Settings) -> Self {
        Self {
            input,
            clock,
            timing: settings.timing.clone(),
            margins: settings.margins.clone(),
            text: settings.text.clone(),
            stashed_clipboard: None,
        }
    }

    fn perform(&mut self, op: &GestureOp) -> PlatformResult<()> {
        match op {
            GestureOp::Move(p) => self.input.move_to(*p),
            GestureOp::Press(p) => self.input.press(*p),
            GestureOp::Release(p) => self.input.release(*p),
            GestureOp::Click(p) => self.input.click(*p),
            GestureOp::Keys(combo) => self.input.key_combo(combo),
            GestureOp::StashClipboard => {
                self.stashed_clipboard = Some(self.input.clipboard()?);
                Ok(())
            }
            GestureOp::SetClipboard(text) => self.input.set_clipboard(text),
            GestureOp::RestoreClipboard => match self.stashed_clipboard.take() {
                Some(previous) if !previous.is_empty() => self.input.set_clipboard(&previous),
                _ => Ok(()),
            },
        }
    }

    /// Run every step in order. A failing required step aborts the gesture;
    /// failing best-effort steps are logged and counted.
    pub fn run(&mut self, gesture: Gesture) -> EngineResult<usize> {
        let mut missed = 0;
        for step in gesture.steps {
            match self.perform(&step.op) {
                Ok(()) => {}
                Err(e) if step.requirement == Requirement::BestEffort => {
                    logger::warn_p("gesture", &format!("{}: {:?} skipped ({})", gesture.name, step.op, e));
                    missed += 1;
                }
                Err(e) => {
                    logger::error_p("gesture", &format!("{}: {:?} failed ({})", gesture.name, step.op, e));
                    return Err(e.into());
                }
            }
            self.clock.sleep_ms(step.settle_ms);
        }
        logger::debug_p("gesture", &format!("{} done", gesture.name));
        Ok(missed)
    }

    /// Focus the session window unless it already has focus. Checked once
    /// per engine invocation.
    pub fn ensure_focus(&mut self, session: &mut SessionContext) -> EngineResult<()> {
        if session.focus_verified() {
            return Ok(());
        }
        let win = session.window_mut()?;
        if !win.has_focus() {
            logger::info_p("gesture", &format!("focusing \"{}\"", win.title()));
            win.focus()?;
            self.clock.sleep_ms(self.timing.focus_settle_ms);
        }
        session.mark_focus_verified();
        Ok(())
    }

    /// Click the first point that accepts the click.
    pub fn click_with_fallback(&mut self, points: &[Point]) -> EngineResult<Point> {
        let mut last_err = None;
        for &p in points {
            match self.input.click(p) {
                Ok(()) => {
                    self.clock.sleep_ms(self.timing.step_ms);
                    return Ok(p);
                }
                Err(e) => {
                    logger::warn_p("gesture", &format!("click {} rejected ({})", p, e));
                    last_err = Some(e);
                }
            }
        }
        Err(match last_err {
            Some(e) => e.into(),
            None => EngineError::Resolution("click target".into()),
        })
    }

    /// Select a toolbar tool: every resolved position in order until a click
    /// goes through, then the keyboard accelerator.
    pub fn click_tool(&mut self, win: &dyn WindowHandle, resolver: &RegionResolver, tool: Tool) -> EngineResult<()> {
        for strategy in resolver.tool_strategies(tool) {
            let p = match strategy.attempt(win) {
                Ok(p) => p,
                Err(e) => {
                    logger::warn_p("gesture", &format!("{}: {} failed ({})", tool.name(), strategy.label(), e));
                    continue;
                }
            };
            match self.input.click(p) {
                Ok(()) => {
                    logger::debug_p("gesture", &format!("{} at {} via {}", tool.name(), p, strategy.label()));
                    self.clock.sleep_ms(self.timing.tool_settle_ms);
                    return Ok(());
                }
                Err(e) => logger::warn_p("gesture", &format!("{}: click {} rejected ({})", tool.name(), p, e)),
            }
        }

        let chords = resolver.accelerator(tool);
        if !chords.is_empty() {
            let mut gesture = Gesture::new("tool accelerator");
            for chord in chords {
                gesture = gesture.required(GestureOp::Keys(chord.clone()), self.timing.tool_settle_ms);
            }
            match self.run(gesture) {
                Ok(_) => return Ok(()),
                Err(EngineError::NotAttached) => return Err(EngineError::NotAttached),
                Err(e) => logger::warn_p("gesture", &format!("{}: accelerator failed ({})", tool.name(), e)),
            }
        }
        Err(EngineError::Resolution(tool.name().to_string()))
    }

    /// Like `click_tool`, but a tool that cannot be selected is only
    /// logged. Returns whether the tool was selected.
    pub fn select_tool(&mut self, win: &dyn WindowHandle, resolver: &RegionResolver, tool: Tool) -> bool {
        match self.click_tool(win, resolver, tool) {
            Ok(()) => true,
            Err(e) => {
                logger::warn_p("gesture", &format!("continuing without {} ({})", tool.name(), e));
                false
            }
        }
    }

    /// Drag out `rect` (canvas-relative) on the canvas. Returns the
    /// normalized rectangle.
    pub fn drag_rectangle(&mut self, canvas: &CanvasRect, rect: RelativeRect) -> EngineResult<RelativeRect> {
        let rect = rect.normalized();
        let abs = rect.to_screen(canvas);
        let start = canvas.clamp(abs.top_left(), self.margins.drag);
        let end = canvas.clamp(Point::new(abs.right, abs.bottom), self.margins.drag);
        logger::debug_p("gesture", &format!("drag {} -> {}", start, end));

        let step = self.timing.step_ms;
        self.run(
            Gesture::new("drag rectangle")
                .best_effort(GestureOp::Click(start), step)
                .required(GestureOp::Press(start), step)
                .required(GestureOp::Move(end), step)
                .required(GestureOp::Release(end), 0),
        )?;
        Ok(rect)
    }

    fn paste_steps(&self, gesture: Gesture, text: &str) -> Gesture {
        let step = self.timing.step_ms;
        let mut gesture = gesture;
        if self.text.restore_clipboard {
            gesture = gesture.best_effort(GestureOp::StashClipboard, 0);
        }
        gesture = gesture
            .required(GestureOp::SetClipboard(text.to_string()), step)
            .required(GestureOp::Keys("ctrl+v".into()), self.timing.paste_settle_ms);
        if self.text.restore_clipboard {
            gesture = gesture.best_effort(GestureOp::RestoreClipboard, 0);
        }
        gesture
    }

    /// Text box for `Anchor::Inside`, kept clear of the canvas edges.
    fn inside_box(&self, canvas: &CanvasRect, rect: RelativeRect) -> ScreenRect {
        let rel = rect.text_box(self.text.rect_margin, self.text.min_box_width, self.text.min_box_height);
        let abs = rel.to_screen(canvas);
        let (near, far) = (self.margins.text, self.margins.commit);
        let near_left = canvas.left.saturating_add(near);
        let near_top = canvas.top.saturating_add(near);
        let left = abs.left.clamp(near_left, canvas.right.saturating_sub(far).max(near_left));
        let top = abs.top.clamp(near_top, canvas.bottom.saturating_sub(far).max(near_top));
        let right = abs.right.min(canvas.right.saturating_sub(near)).max(left.saturating_add(10));
        let bottom = abs.bottom.min(canvas.bottom.saturating_sub(near)).max(top.saturating_add(10));
        ScreenRect::new(left, top, right, bottom)
    }

    /// Select the text tool, open a text box at `anchor`, paste `text` and
    /// click away to commit it.
    pub fn place_and_type_text(
        &mut self,
        win: &dyn WindowHandle,
        resolver: &RegionResolver,
        canvas: &CanvasRect,
        text: &str,
        anchor: Anchor,
    ) -> EngineResult<TextPlacement> {
        self.select_tool(win, resolver, Tool::Text);

        let step = self.timing.step_ms;
        let settle = self.timing.text_settle_ms;
        let (gesture, placement) = match anchor {
            Anchor::Inset => {
                let inset = self.text.default_inset;
                let p = canvas.clamp(canvas.top_left().offset(inset.x, inset.y), self.margins.text);
                (Gesture::new("place text").required(GestureOp::Click(p), settle), TextPlacement { anchor: p, text_box: None })
            }
            Anchor::At(rel) => {
                let p = canvas.clamp(canvas.top_left().offset(rel.x, rel.y), self.margins.text);
                (Gesture::new("place text").required(GestureOp::Click(p), settle), TextPlacement { anchor: p, text_box: None })
            }
            Anchor::Inside(rect) => {
                let tb = self.inside_box(canvas, rect);
                let (start, end, center) = (tb.top_left(), Point::new(tb.right, tb.bottom), tb.center());
                let gesture = Gesture::new("place text box")
                    .required(GestureOp::Click(start), step)
                    .required(GestureOp::Press(start), step)
                    .required(GestureOp::Move(end), step)
                    .required(GestureOp::Release(end), settle)
                    .required(GestureOp::Click(center), step)
                    .best_effort(GestureOp::Click(center.offset(5, 3)), step);
                (gesture, TextPlacement { anchor: center, text_box: Some(tb) })
            }
        };

        let commit = Point::new(
            canvas.right.saturating_sub(self.margins.commit),
            canvas.bottom.saturating_sub(self.margins.commit),
        );
        let gesture = self
            .paste_steps(gesture, text)
            .best_effort(GestureOp::Click(commit), step);
        self.run(gesture)?;
        Ok(placement)
    }

    /// Plain click with the step delay, for one-off targets.
    pub fn click(&mut self, p: Point) -> EngineResult<()> {
        self.run(Gesture::new("click").required(GestureOp::Click(p), self.timing.step_ms))
            .map(|_| ())
    }
}
