use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Window identifier (HWND value on Windows, synthetic id in the stub)
pub type WindowId = u64;

/// Absolute screen coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy) }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Midpoint without overflow at the ends of the `i32` range.
fn midpoint(a: i32, b: i32) -> i32 {
    ((a as i64 + b as i64) / 2) as i32
}

/// Screen-coordinate rectangle. Always `left <= right` and `top <= bottom`,
/// including when read from JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRect")]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Deserialize)]
struct RawRect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl From<RawRect> for ScreenRect {
    fn from(r: RawRect) -> Self {
        ScreenRect::new(r.left, r.top, r.right, r.bottom)
    }
}

/// The drawable area of the target window.
pub type CanvasRect = ScreenRect;

impl ScreenRect {
    /// Build from two arbitrary corners.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn center(&self) -> Point {
        Point::new(midpoint(self.left, self.right), midpoint(self.top, self.bottom))
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Shrink by independent insets on each side. Collapses to the center
    /// line instead of inverting when the insets exceed the size.
    pub fn shrink(&self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        let l = self.left.saturating_add(left);
        let r = self.right.saturating_sub(right);
        let t = self.top.saturating_add(top);
        let b = self.bottom.saturating_sub(bottom);
        let (l, r) = if l <= r { (l, r) } else { let m = midpoint(l, r); (m, m) };
        let (t, b) = if t <= b { (t, b) } else { let m = midpoint(t, b); (m, m) };
        Self { left: l, top: t, right: r, bottom: b }
    }

    /// Pull `p` at least `margin` pixels inside the edges. On an axis narrower
    /// than `2 * margin` the margin shrinks to half the extent.
    pub fn clamp(&self, p: Point, margin: i32) -> Point {
        Point::new(
            clamp_axis(p.x, self.left, self.right, margin),
            clamp_axis(p.y, self.top, self.bottom, margin),
        )
    }

    /// Point at a fraction of the width/height, measured from the top-left.
    pub fn proportional(&self, x_ratio: f64, y_ratio: f64) -> Point {
        Point::new(
            self.left.saturating_add((x_ratio * self.width() as f64) as i32),
            self.top.saturating_add((y_ratio * self.height() as f64) as i32),
        )
    }
}

fn clamp_axis(v: i32, lo: i32, hi: i32, margin: i32) -> i32 {
    let (lo, hi) = (lo.min(hi), lo.max(hi));
    let half = ((hi as i64 - lo as i64) / 2) as i32;
    let m = margin.clamp(0, half);
    v.clamp(lo + m, hi - m)
}

impl fmt::Display for ScreenRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.left, self.top, self.right, self.bottom)
    }
}

/// Rectangle in canvas-relative coordinates, as requested by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl RelativeRect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Top-left / bottom-right form: `x1 <= x2`, `y1 <= y2`.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(midpoint(self.x1, self.x2), midpoint(self.y1, self.y2))
    }

    /// Text box inside this rectangle: `margin` in from every edge, but never
    /// smaller than `min_w` x `min_h`.
    pub fn text_box(&self, margin: i32, min_w: i32, min_h: i32) -> Self {
        let r = self.normalized();
        let left = r.x1.saturating_add(margin);
        let top = r.y1.saturating_add(margin);
        Self {
            x1: left,
            y1: top,
            x2: r.x2.saturating_sub(margin).max(left.saturating_add(min_w)),
            y2: r.y2.saturating_sub(margin).max(top.saturating_add(min_h)),
        }
    }

    /// Translate onto the screen using the canvas origin.
    pub fn to_screen(&self, canvas: &CanvasRect) -> ScreenRect {
        let r = self.normalized();
        ScreenRect::new(
            canvas.left.saturating_add(r.x1),
            canvas.top.saturating_add(r.y1),
            canvas.left.saturating_add(r.x2),
            canvas.top.saturating_add(r.y2),
        )
    }
}

impl fmt::Display for RelativeRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Cell in the color grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteIndex {
    pub column: u32,
    pub row: u32,
}

impl PaletteIndex {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

/// The closed set of colors the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Red,
    Green,
    Blue,
    Yellow,
    Black,
    White,
    Orange,
    Purple,
    Pink,
    Brown,
    Gray,
}

impl ColorName {
    pub const ALL: [ColorName; 11] = [
        ColorName::Red,
        ColorName::Green,
        ColorName::Blue,
        ColorName::Yellow,
        ColorName::Black,
        ColorName::White,
        ColorName::Orange,
        ColorName::Purple,
        ColorName::Pink,
        ColorName::Brown,
        ColorName::Gray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorName::Red => "red",
            ColorName::Green => "green",
            ColorName::Blue => "blue",
            ColorName::Yellow => "yellow",
            ColorName::Black => "black",
            ColorName::White => "white",
            ColorName::Orange => "orange",
            ColorName::Purple => "purple",
            ColorName::Pink => "pink",
            ColorName::Brown => "brown",
            ColorName::Gray => "gray",
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ColorName::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unsupported color '{}'", s.trim()))
    }
}

/// Facts extracted from the user's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facts {
    pub text: String,
    pub color: ColorName,
}

/// One step of an action plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionStep {
    OpenApplication,
    SelectColor { color: String },
    WriteText { text: String },
    WriteTextAt { text: String, x: i32, y: i32 },
    DrawRectangle { x1: i32, y1: i32, x2: i32, y2: i32 },
    WriteTextInLastRectangle { text: String },
    CloseApplication,
}

impl ActionStep {
    pub fn name(&self) -> &'static str {
        match self {
            ActionStep::OpenApplication => "open_application",
            ActionStep::SelectColor { .. } => "select_color",
            ActionStep::WriteText { .. } => "write_text",
            ActionStep::WriteTextAt { .. } => "write_text_at",
            ActionStep::DrawRectangle { .. } => "draw_rectangle",
            ActionStep::WriteTextInLastRectangle { .. } => "write_text_in_last_rectangle",
            ActionStep::CloseApplication => "close_application",
        }
    }
}

/// Aggregate outcome of one plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), details: BTreeMap::new() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), details: BTreeMap::new() }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Top-level window as seen by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
    pub pid: u32,
    pub exe: String,
}

/// Control kinds the structured query distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    Pane,
    Button,
}

/// Command from the front-end to the plan worker
pub enum Command {
    Run(Vec<ActionStep>),
    Quit,
}

/// Plan worker state shared with the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct RunStatus {
    pub state: WorkerState,
    pub last_result: Option<ActionResult>,
    pub runs: u32,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self { state: WorkerState::Idle, last_result: None, runs: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_orders_corners_and_is_idempotent() {
        let r = RelativeRect::new(110, 60, 10, 10).normalized();
        assert_eq!(r, RelativeRect::new(10, 10, 110, 60));
        assert_eq!(r.normalized(), r);

        let mixed = RelativeRect::new(5, 90, 50, 20).normalized();
        assert_eq!(mixed, RelativeRect::new(5, 20, 50, 90));
    }

    #[test]
    fn clamp_is_idempotent_and_stays_inside() {
        let rect = ScreenRect::new(355, 325, 1555, 880);
        let samples = [
            Point::new(0, 0),
            Point::new(10_000, -40),
            Point::new(356, 879),
            Point::new(900, 600),
            Point::new(1555, 325),
        ];
        for margin in [2, 4, 8] {
            for p in samples {
                let once = rect.clamp(p, margin);
                assert_eq!(rect.clamp(once, margin), once);
                assert!(once.x >= rect.left + margin && once.x <= rect.right - margin);
                assert!(once.y >= rect.top + margin && once.y <= rect.bottom - margin);
            }
        }
    }

    #[test]
    fn clamp_on_tiny_rect_does_not_invert() {
        let rect = ScreenRect::new(0, 0, 3, 3);
        let p = rect.clamp(Point::new(50, -50), 8);
        assert!(rect.contains(p));
    }

    #[test]
    fn inverted_rect_from_json_is_reordered() {
        let r: ScreenRect =
            serde_json::from_str(r#"{"left":900,"top":500,"right":899,"bottom":100}"#).unwrap();
        assert_eq!(r, ScreenRect::new(899, 100, 900, 500));
        let p = r.clamp(Point::new(0, 0), 8);
        assert!(r.contains(p));
    }

    #[test]
    fn clamp_tolerates_a_hand_built_inverted_rect() {
        let r = ScreenRect { left: 900, top: 500, right: 899, bottom: 100 };
        let p = r.clamp(Point::new(1000, 1000), 4);
        assert_eq!(p, Point::new(900, 496));
    }

    #[test]
    fn extreme_coordinates_saturate() {
        let canvas = ScreenRect::new(355, 325, 1555, 880);
        let huge = RelativeRect::new(i32::MIN, 0, i32::MAX, 10).to_screen(&canvas);
        assert_eq!(huge.right, i32::MAX);
        assert_eq!(huge.left, i32::MIN + 355);
        assert!(canvas.contains(canvas.clamp(Point::new(huge.right, huge.bottom), 2)));

        let wide = ScreenRect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(wide.width(), i32::MAX);
        assert_eq!(wide.center(), Point::new(0, 0));
        assert_eq!(Point::new(i32::MAX, 0).offset(5, 3), Point::new(i32::MAX, 3));

        let tb = RelativeRect::new(0, 0, i32::MAX, 10).text_box(10, 40, 20);
        assert_eq!(tb.x2, i32::MAX - 10);
        assert_eq!(tb.y2, 30);
    }

    #[test]
    fn text_box_respects_margin_and_floors() {
        let tb = RelativeRect::new(10, 10, 110, 60).text_box(10, 40, 20);
        assert_eq!(tb, RelativeRect::new(20, 20, 100, 50));

        let small = RelativeRect::new(0, 0, 30, 15).text_box(10, 40, 20);
        assert_eq!(small, RelativeRect::new(10, 10, 50, 30));
    }

    #[test]
    fn color_names_parse_case_insensitively() {
        assert_eq!("Blue".parse::<ColorName>(), Ok(ColorName::Blue));
        assert_eq!(" GRAY ".parse::<ColorName>(), Ok(ColorName::Gray));
        assert!("teal".parse::<ColorName>().is_err());
    }

    #[test]
    fn action_step_serde_shape() {
        let step: ActionStep =
            serde_json::from_str(r#"{"action":"draw_rectangle","x1":1,"y1":2,"x2":3,"y2":4}"#).unwrap();
        assert_eq!(step, ActionStep::DrawRectangle { x1: 1, y1: 2, x2: 3, y2: 4 });
        let open: ActionStep = serde_json::from_str(r#"{"action":"open_application"}"#).unwrap();
        assert_eq!(open.name(), "open_application");
    }
}
