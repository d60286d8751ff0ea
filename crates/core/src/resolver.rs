use std::time::Duration;

use regex::Regex;

use crate::error::{EngineError, EngineResult};
use crate::logger;
use crate::platform::WindowHandle;
use crate::settings::{CanvasSettings, Settings, ToolSettings};
use crate::types::*;

/// Toolbar controls the engine knows how to pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Rectangle,
    Text,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Rectangle => "rectangle tool",
            Tool::Text => "text tool",
        }
    }
}

type Attempt<'a, T> = Box<dyn Fn(&dyn WindowHandle) -> EngineResult<T> + 'a>;

/// One independently failable way of resolving a target.
pub struct Strategy<'a, T> {
    label: String,
    attempt: Attempt<'a, T>,
}

impl<'a, T> Strategy<'a, T> {
    pub fn new(label: impl Into<String>, attempt: impl Fn(&dyn WindowHandle) -> EngineResult<T> + 'a) -> Self {
        Self { label: label.into(), attempt: Box::new(attempt) }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attempt(&self, win: &dyn WindowHandle) -> EngineResult<T> {
        (self.attempt)(win)
    }
}

/// Try `strategies` in order and keep the first success.
pub fn first_success<T>(what: &str, strategies: &[Strategy<'_, T>], win: &dyn WindowHandle)
    -> EngineResult<(String, T)>
{
    for s in strategies {
        match s.attempt(win) {
            Ok(found) => {
                logger::debug_p("resolver", &format!("{} via {}", what, s.label()));
                return Ok((s.label().to_string(), found));
            }
            Err(e) => logger::warn_p("resolver", &format!("{}: {} failed ({})", what, s.label(), e)),
        }
    }
    Err(EngineError::Resolution(what.to_string()))
}

struct ToolTarget {
    settings: ToolSettings,
    name: Regex,
}

/// Turns semantic regions (canvas, toolbar buttons) into screen coordinates.
pub struct RegionResolver {
    canvas: CanvasSettings,
    canvas_name: Regex,
    rectangle: ToolTarget,
    text: ToolTarget,
    tool_margin: i32,
}

impl RegionResolver {
    pub fn new(settings: &Settings) -> Result<Self, regex::Error> {
        Ok(Self {
            canvas: settings.canvas.clone(),
            canvas_name: Regex::new(&settings.canvas.name_pattern)?,
            rectangle: ToolTarget {
                settings: settings.rectangle_tool.clone(),
                name: Regex::new(&settings.rectangle_tool.name_pattern)?,
            },
            text: ToolTarget {
                settings: settings.text_tool.clone(),
                name: Regex::new(&settings.text_tool.name_pattern)?,
            },
            tool_margin: settings.margins.tool,
        })
    }

    fn target(&self, tool: Tool) -> &ToolTarget {
        match tool {
            Tool::Rectangle => &self.rectangle,
            Tool::Text => &self.text,
        }
    }

    /// Structured query, then calibrated rectangle, then window insets.
    pub fn canvas_strategies(&self) -> Vec<Strategy<'_, CanvasRect>> {
        let mut out = vec![Strategy::new("structured query", move |win: &dyn WindowHandle| {
            win.find_control(
                &self.canvas_name,
                self.canvas.kind,
                Duration::from_millis(self.canvas.query_timeout_ms),
            )
            .map_err(|e| EngineError::Resolution(format!("canvas query: {}", e)))
        })];
        if let Some(fixed) = self.canvas.fixed {
            out.push(Strategy::new("calibrated rectangle", move |_: &dyn WindowHandle| Ok(fixed)));
        }
        out.push(Strategy::new("window insets", move |win: &dyn WindowHandle| {
            let [l, t, r, b] = self.canvas.window_inset;
            win.rect()
                .map(|rect| rect.shrink(l, t, r, b))
                .map_err(|e| EngineError::Resolution(format!("window rect: {}", e)))
        }));
        out
    }

    pub fn resolve_canvas(&self, win: &dyn WindowHandle) -> EngineResult<CanvasRect> {
        let (source, canvas) = first_success("canvas", &self.canvas_strategies(), win)?;
        logger::info_p("resolver", &format!("canvas {} from {}", canvas, source));
        Ok(canvas)
    }

    /// Candidate positions for a toolbar button, best first. Every position
    /// is pulled inside the window rectangle when that is known.
    pub fn tool_strategies(&self, tool: Tool) -> Vec<Strategy<'_, Point>> {
        let target = self.target(tool);
        let margin = self.tool_margin;
        let inside = move |win: &dyn WindowHandle, p: Point| match win.rect() {
            Ok(rect) => rect.clamp(p, margin),
            Err(_) => p,
        };

        let mut out = vec![Strategy::new("structured query", move |win: &dyn WindowHandle| {
            win.find_control(
                &target.name,
                target.settings.kind,
                Duration::from_millis(target.settings.query_timeout_ms),
            )
            .map(|rect| inside(win, rect.center()))
            .map_err(|e| EngineError::Resolution(format!("{} query: {}", tool.name(), e)))
        })];
        if let Some(fixed) = target.settings.fixed {
            out.push(Strategy::new("calibrated point", move |win: &dyn WindowHandle| Ok(inside(win, fixed))));
        }
        for &[fx, fy] in &target.settings.candidates {
            let label = format!("window {:.0}%/{:.0}%", fx * 100.0, fy * 100.0);
            out.push(Strategy::new(label, move |win: &dyn WindowHandle| {
                win.rect()
                    .map(|rect| rect.clamp(rect.proportional(fx, fy), margin))
                    .map_err(|e| EngineError::Resolution(format!("window rect: {}", e)))
            }));
        }
        out
    }

    pub fn resolve_tool_position(&self, win: &dyn WindowHandle, tool: Tool) -> EngineResult<Point> {
        first_success(tool.name(), &self.tool_strategies(tool), win).map(|(_, p)| p)
    }

    /// Keyboard chords that select `tool` when no position works.
    pub fn accelerator(&self, tool: Tool) -> &[String] {
        &self.target(tool).settings.accelerator
    }
}
